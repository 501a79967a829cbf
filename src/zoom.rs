//! Zoom ladder and level/percentage conversions for the embedded view.
//!
//! Levels use the Chromium convention: zoom factor = 1.2 ^ level, level 0 is
//! 100%. The persisted setting stores a level; the webview itself is driven
//! by a scale factor.

pub const ZOOM_PERCENTAGES: [u32; 13] = [33, 50, 67, 75, 90, 100, 110, 125, 150, 175, 200, 225, 250];

pub fn percentage_to_zoom_level(percentage: u32) -> f64 {
    (percentage as f64 / 100.0).ln() / 1.2f64.ln()
}

pub fn zoom_level_to_percentage(level: f64) -> u32 {
    (1.2f64.powf(level) * 100.0).round() as u32
}

/// Scale factor handed to the webview for a given level.
pub fn zoom_scale(level: f64) -> f64 {
    1.2f64.powf(level)
}

/// Index of the ladder step closest to the given level.
pub fn closest_zoom_index(level: f64) -> usize {
    let current = zoom_level_to_percentage(level);

    let mut closest_index = 0;
    let mut min_diff = ZOOM_PERCENTAGES[0].abs_diff(current);

    for (i, &percentage) in ZOOM_PERCENTAGES.iter().enumerate().skip(1) {
        let diff = percentage.abs_diff(current);
        if diff < min_diff {
            min_diff = diff;
            closest_index = i;
        }
    }

    closest_index
}

/// Level one ladder step away from `level`, clamped at the ends.
pub fn stepped_zoom_level(level: f64, delta: i32) -> f64 {
    let index = closest_zoom_index(level) as i32 + delta;
    let index = index.clamp(0, ZOOM_PERCENTAGES.len() as i32 - 1) as usize;
    percentage_to_zoom_level(ZOOM_PERCENTAGES[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_zero_is_100_percent() {
        assert_eq!(zoom_level_to_percentage(0.0), 100);
        assert!(percentage_to_zoom_level(100).abs() < 1e-9);
        assert!((zoom_scale(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ladder_round_trips() {
        for percentage in ZOOM_PERCENTAGES {
            let level = percentage_to_zoom_level(percentage);
            assert_eq!(zoom_level_to_percentage(level), percentage);
        }
    }

    #[test]
    fn test_closest_index_snaps() {
        assert_eq!(closest_zoom_index(0.0), 5); // 100%
        assert_eq!(closest_zoom_index(percentage_to_zoom_level(250)), 12);
        assert_eq!(closest_zoom_index(percentage_to_zoom_level(33)), 0);
        // 104% sits nearer 100 than 110.
        assert_eq!(closest_zoom_index(percentage_to_zoom_level(104)), 5);
    }

    #[test]
    fn test_stepping_clamps_at_the_ends() {
        let max = percentage_to_zoom_level(250);
        let min = percentage_to_zoom_level(33);
        assert_eq!(zoom_level_to_percentage(stepped_zoom_level(max, 1)), 250);
        assert_eq!(zoom_level_to_percentage(stepped_zoom_level(min, -1)), 33);
        assert_eq!(zoom_level_to_percentage(stepped_zoom_level(0.0, 1)), 110);
        assert_eq!(zoom_level_to_percentage(stepped_zoom_level(0.0, -1)), 90);
    }
}
