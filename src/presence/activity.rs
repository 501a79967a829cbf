//! Activity taxonomy and presence payload composition.

use std::fmt;

/// Discord asset key for the large icon.
pub const LARGE_IMAGE_KEY: &str = "chess_logo";
/// Hover text for the large icon.
pub const LARGE_IMAGE_TEXT: &str = "Chess Desktop App";
/// Label of the single presence button.
pub const BUTTON_LABEL: &str = "Get the App";
/// Target of the presence button.
pub const BUTTON_URL: &str = "https://chessdesktop.app";

const SITE_NAME: &str = "Chess.com";

/// What the user is currently doing on the embedded page.
///
/// This is a closed set: the detector always produces exactly one of these,
/// falling back to `Browsing` whenever nothing more specific can be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityMode {
    Playing,
    Analyzing,
    Spectating,
    #[default]
    Browsing,
    Puzzles,
    PuzzleRush,
    PuzzleBattle,
    Daily,
    Practicing,
    VsComputer,
}

/// One detection result, produced once per poll tick.
///
/// An absent optional field means "not applicable to this mode", never
/// "unknown" -- the composer renders nothing for absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub mode: ActivityMode,
    /// Raw time-control token from the page (e.g. "blitz", "10").
    pub time_control: Option<String>,
    /// Opponent display name, optionally suffixed with a rating.
    pub opponent: Option<String>,
    /// Current page address, for live-game and spectating modes.
    pub url: Option<String>,
}

impl ActivitySnapshot {
    /// The fallback snapshot used whenever the page cannot be inspected.
    pub fn browsing() -> Self {
        Self::default()
    }
}

/// Display category for a game's pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControl {
    Bullet,
    Blitz,
    Rapid,
    Classical,
    Daily,
    /// Generic fallback when no time control is known.
    Chess,
}

impl TimeControl {
    /// Normalize a raw time-control token into a display category.
    ///
    /// Known keywords map directly; otherwise the first run of digits in the
    /// token is read as a minute count and bucketed. Tokens with no digits,
    /// or a missing token, fall back to `Chess`.
    pub fn classify(token: Option<&str>) -> Self {
        let Some(token) = token else {
            return Self::Chess;
        };

        match token.trim().to_ascii_lowercase().as_str() {
            "bullet" => return Self::Bullet,
            "blitz" => return Self::Blitz,
            "rapid" => return Self::Rapid,
            "classical" | "classic" => return Self::Classical,
            "daily" => return Self::Daily,
            _ => {}
        }

        let digits: String = token
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();

        match digits.parse::<u32>() {
            Ok(minutes) if minutes < 3 => Self::Bullet,
            Ok(minutes) if minutes < 10 => Self::Blitz,
            Ok(minutes) if minutes < 30 => Self::Rapid,
            Ok(_) => Self::Classical,
            Err(_) => Self::Chess,
        }
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bullet => "Bullet",
            Self::Blitz => "Blitz",
            Self::Rapid => "Rapid",
            Self::Classical => "Classical",
            Self::Daily => "Daily",
            Self::Chess => "Chess",
        };
        f.write_str(label)
    }
}

/// The activity pushed to Discord. Recomputed from scratch every tick and
/// overwritten idempotently; never diffed against the previous payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresencePayload {
    pub state: String,
    pub details: Option<String>,
    pub large_image_key: &'static str,
    pub large_image_text: &'static str,
    pub button_label: &'static str,
    pub button_url: &'static str,
    /// Session start in Unix milliseconds, captured once per connection.
    pub started_at: i64,
}

/// Render a snapshot into the payload shown on Discord.
///
/// Pure and total over the mode set; `started_at` is passed through
/// unchanged so the elapsed timer is anchored to the connection, not to
/// activity changes.
pub fn compose(snapshot: &ActivitySnapshot, started_at: i64) -> PresencePayload {
    let category = TimeControl::classify(snapshot.time_control.as_deref());

    let (state, details) = match snapshot.mode {
        ActivityMode::Playing => (
            format!("Playing {category}"),
            snapshot.opponent.as_ref().map(|name| format!("vs {name}")),
        ),
        ActivityMode::VsComputer => ("Playing vs Computer".to_string(), None),
        ActivityMode::Spectating => (format!("Watching a {category} Game"), None),
        ActivityMode::Analyzing => ("Analyzing a Game".to_string(), None),
        ActivityMode::PuzzleRush => ("Playing Puzzle Rush".to_string(), None),
        ActivityMode::PuzzleBattle => ("Playing Puzzle Battle".to_string(), None),
        ActivityMode::Puzzles => ("Solving Puzzles".to_string(), None),
        ActivityMode::Daily => ("Solving Daily Puzzle".to_string(), None),
        ActivityMode::Practicing => ("Practicing".to_string(), None),
        ActivityMode::Browsing => (format!("Browsing {SITE_NAME}"), None),
    };

    PresencePayload {
        state,
        details,
        large_image_key: LARGE_IMAGE_KEY,
        large_image_text: LARGE_IMAGE_TEXT,
        button_label: BUTTON_LABEL,
        button_url: BUTTON_URL,
        started_at,
    }
}
