//! Heuristic activity detection against the embedded chess.com page.
//!
//! The page exposes no structured state API, so detection is a read-only
//! snapshot of the URL plus a handful of DOM observations, classified by
//! path-prefix precedence. All of the selector and path brittleness is
//! quarantined here: the rest of the engine only ever sees an
//! [`ActivitySnapshot`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::activity::{ActivityMode, ActivitySnapshot};

/// Failure while inspecting the page. Never escalated: every variant
/// degrades the current tick to `Browsing`.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("webview is gone")]
    ViewGone,
    #[error("probe script failed: {0}")]
    Script(String),
    #[error("probe timed out")]
    Timeout,
    #[error("probe superseded by a newer tick")]
    Superseded,
}

/// Raw observations read from the page in a single pass. Everything here is
/// best-effort; missing elements simply leave their field empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSnapshot {
    /// Full page address.
    pub url: String,
    /// A recognizable game board is present.
    pub has_board: bool,
    /// Rematch / new-game affordances are shown (the game has ended).
    pub has_game_over_controls: bool,
    /// Resign / draw affordances are shown (the local user is playing).
    pub has_live_game_controls: bool,
    /// Class of the time-control glyph, e.g. `game-time-blitz`.
    pub time_control_class: Option<String>,
    /// Display name of the non-local player.
    pub opponent_name: Option<String>,
    /// Rating text of the non-local player, usually parenthesized.
    pub opponent_rating: Option<String>,
}

/// Read-only handle onto the embedded view.
///
/// The handle is owned by the window layer and may be cleared or replaced at
/// any time; the detector re-reads it on every call and never mutates the
/// page.
pub trait ViewProbe: Send + Sync + 'static {
    /// Whether the underlying view still exists.
    fn is_live(&self) -> bool;

    /// Run the read-only snapshot query against the page.
    fn snapshot(&self) -> impl Future<Output = Result<PageSnapshot, ProbeError>> + Send;
}

/// Swappable slot holding the current view handle.
#[derive(Debug)]
pub struct ViewSlot<V>(Arc<Mutex<Option<Arc<V>>>>);

impl<V> Clone for ViewSlot<V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<V> Default for ViewSlot<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ViewSlot<V> {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    /// Replace (or clear) the current view handle.
    pub fn set(&self, view: Option<Arc<V>>) {
        *self.0.lock().unwrap() = view;
    }

    pub fn get(&self) -> Option<Arc<V>> {
        self.0.lock().unwrap().clone()
    }
}

static RE_GAME_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(?:analysis/)?game/(?:live/|daily/)?\d+").unwrap());
static RE_ENDED_GAME_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/analysis/").unwrap());
static RE_TIME_GLYPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"game-time-([A-Za-z0-9]+)").unwrap());

const PUZZLE_RUSH_PREFIX: &str = "/puzzles/rush";
const PUZZLE_BATTLE_PREFIX: &str = "/puzzles/battle";
const PUZZLES_PREFIX: &str = "/puzzles";
const DAILY_PUZZLE_PREFIX: &str = "/daily-chess-puzzle";
const PRACTICE_PREFIX: &str = "/practice";
const VS_COMPUTER_PREFIX: &str = "/play/computer";
const EVENTS_PREFIX: &str = "/events";

/// Queries the current view and classifies the result. Detection never
/// fails outward; any problem yields a `Browsing` snapshot for that tick.
pub struct StateDetector<V> {
    view: ViewSlot<V>,
}

impl<V: ViewProbe> StateDetector<V> {
    pub fn new(view: ViewSlot<V>) -> Self {
        Self { view }
    }

    pub async fn detect(&self) -> ActivitySnapshot {
        let Some(view) = self.view.get() else {
            return ActivitySnapshot::browsing();
        };

        if !view.is_live() {
            tracing::debug!("View handle reports destroyed; treating as browsing");
            return ActivitySnapshot::browsing();
        }

        match view.snapshot().await {
            Ok(page) => classify_page(&page),
            Err(e) => {
                tracing::debug!("Page probe failed: {e}");
                ActivitySnapshot::browsing()
            }
        }
    }
}

/// Classify one page snapshot. First match wins, top to bottom.
pub fn classify_page(page: &PageSnapshot) -> ActivitySnapshot {
    let path = page_path(&page.url);

    if path.starts_with(PUZZLE_RUSH_PREFIX) {
        return mode_only(ActivityMode::PuzzleRush);
    }
    if path.starts_with(PUZZLE_BATTLE_PREFIX) {
        return mode_only(ActivityMode::PuzzleBattle);
    }
    if path.starts_with(PUZZLES_PREFIX) {
        return mode_only(ActivityMode::Puzzles);
    }
    if path.starts_with(DAILY_PUZZLE_PREFIX) {
        return mode_only(ActivityMode::Daily);
    }
    if path.starts_with(PRACTICE_PREFIX) {
        return mode_only(ActivityMode::Practicing);
    }
    if path.starts_with(VS_COMPUTER_PREFIX) {
        return mode_only(ActivityMode::VsComputer);
    }

    if path.starts_with(EVENTS_PREFIX) && page.has_board {
        return ActivitySnapshot {
            mode: ActivityMode::Spectating,
            time_control: extract_time_control(page),
            opponent: None,
            url: Some(page.url.clone()),
        };
    }

    if RE_GAME_PATH.is_match(&path) {
        let time_control = extract_time_control(page);

        if page.has_game_over_controls || RE_ENDED_GAME_PATH.is_match(&path) {
            return ActivitySnapshot {
                mode: ActivityMode::Analyzing,
                time_control,
                opponent: None,
                url: None,
            };
        }

        if page.has_live_game_controls {
            return ActivitySnapshot {
                mode: ActivityMode::Playing,
                time_control,
                opponent: resolve_opponent(page),
                url: Some(page.url.clone()),
            };
        }

        return ActivitySnapshot {
            mode: ActivityMode::Spectating,
            time_control,
            opponent: None,
            url: Some(page.url.clone()),
        };
    }

    ActivitySnapshot::browsing()
}

fn mode_only(mode: ActivityMode) -> ActivitySnapshot {
    ActivitySnapshot {
        mode,
        ..Default::default()
    }
}

/// Path component of the page address. A bare path is accepted as-is so the
/// classifier can be exercised without a full URL.
fn page_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) if url.starts_with('/') => url.to_string(),
        Err(_) => String::new(),
    }
}

fn extract_time_control(page: &PageSnapshot) -> Option<String> {
    let class = page.time_control_class.as_deref()?;
    RE_TIME_GLYPH
        .captures(class)
        .map(|caps| caps[1].to_string())
}

/// Opponent display name with an optional rating suffix. Literal parenthesis
/// characters in the raw rating text are stripped before rendering.
fn resolve_opponent(page: &PageSnapshot) -> Option<String> {
    let name = page.opponent_name.as_deref()?.trim();
    if name.is_empty() {
        return None;
    }

    let rating = page
        .opponent_rating
        .as_deref()
        .map(|r| r.replace(['(', ')'], ""))
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    match rating {
        Some(rating) => Some(format!("{name} ({rating})")),
        None => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> PageSnapshot {
        PageSnapshot {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_puzzle_paths_take_precedence() {
        let cases = [
            ("https://www.chess.com/puzzles/rush", ActivityMode::PuzzleRush),
            (
                "https://www.chess.com/puzzles/battle",
                ActivityMode::PuzzleBattle,
            ),
            ("https://www.chess.com/puzzles/rated", ActivityMode::Puzzles),
            ("https://www.chess.com/puzzles", ActivityMode::Puzzles),
            (
                "https://www.chess.com/daily-chess-puzzle",
                ActivityMode::Daily,
            ),
            ("https://www.chess.com/practice", ActivityMode::Practicing),
            (
                "https://www.chess.com/play/computer",
                ActivityMode::VsComputer,
            ),
        ];
        for (url, expected) in cases {
            assert_eq!(classify_page(&page(url)).mode, expected, "url {url}");
        }
    }

    #[test]
    fn test_everything_else_is_browsing() {
        for url in [
            "https://www.chess.com/",
            "https://www.chess.com/home",
            "https://www.chess.com/forum/view/general",
            "not a url",
            "",
        ] {
            assert_eq!(
                classify_page(&page(url)).mode,
                ActivityMode::Browsing,
                "url {url}"
            );
        }
    }

    #[test]
    fn test_event_broadcast_needs_a_board() {
        let without_board = page("https://www.chess.com/events/2026-candidates");
        assert_eq!(classify_page(&without_board).mode, ActivityMode::Browsing);

        let mut with_board = without_board.clone();
        with_board.has_board = true;
        with_board.time_control_class = Some("icon-font-chess game-time-rapid".to_string());
        let snapshot = classify_page(&with_board);
        assert_eq!(snapshot.mode, ActivityMode::Spectating);
        assert_eq!(snapshot.time_control.as_deref(), Some("rapid"));
        assert!(snapshot.url.is_some());
    }

    #[test]
    fn test_game_with_live_controls_is_playing() {
        let mut p = page("https://www.chess.com/game/live/140382941261");
        p.has_live_game_controls = true;
        p.time_control_class = Some("game-time-blitz".to_string());
        p.opponent_name = Some("Bob".to_string());
        p.opponent_rating = Some("(1500)".to_string());

        let snapshot = classify_page(&p);
        assert_eq!(snapshot.mode, ActivityMode::Playing);
        assert_eq!(snapshot.time_control.as_deref(), Some("blitz"));
        assert_eq!(snapshot.opponent.as_deref(), Some("Bob (1500)"));
    }

    #[test]
    fn test_game_over_controls_win_over_live_controls() {
        let mut p = page("https://www.chess.com/game/live/123");
        p.has_live_game_controls = true;
        p.has_game_over_controls = true;
        assert_eq!(classify_page(&p).mode, ActivityMode::Analyzing);
    }

    #[test]
    fn test_post_mortem_path_is_analyzing() {
        let p = page("https://www.chess.com/analysis/game/live/123");
        assert_eq!(classify_page(&p).mode, ActivityMode::Analyzing);
    }

    #[test]
    fn test_game_without_controls_is_spectating() {
        let p = page("https://www.chess.com/game/daily/456");
        let snapshot = classify_page(&p);
        assert_eq!(snapshot.mode, ActivityMode::Spectating);
        assert_eq!(snapshot.url.as_deref(), Some("https://www.chess.com/game/daily/456"));
    }

    #[test]
    fn test_opponent_without_rating() {
        let mut p = page("https://www.chess.com/game/live/1");
        p.has_live_game_controls = true;
        p.opponent_name = Some("  Alice  ".to_string());
        assert_eq!(
            classify_page(&p).opponent.as_deref(),
            Some("Alice")
        );

        p.opponent_rating = Some("( )".to_string());
        assert_eq!(classify_page(&p).opponent.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_blank_opponent_name_is_dropped() {
        let mut p = page("https://www.chess.com/game/live/1");
        p.has_live_game_controls = true;
        p.opponent_name = Some("   ".to_string());
        p.opponent_rating = Some("(1500)".to_string());
        assert_eq!(classify_page(&p).opponent, None);
    }

    struct FixedProbe {
        live: bool,
        result: Result<PageSnapshot, ProbeError>,
    }

    impl ViewProbe for FixedProbe {
        fn is_live(&self) -> bool {
            self.live
        }

        async fn snapshot(&self) -> Result<PageSnapshot, ProbeError> {
            match &self.result {
                Ok(p) => Ok(p.clone()),
                Err(_) => Err(ProbeError::Script("boom".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_detect_without_view_is_browsing() {
        let slot: ViewSlot<FixedProbe> = ViewSlot::new();
        let detector = StateDetector::new(slot);
        assert_eq!(detector.detect().await.mode, ActivityMode::Browsing);
    }

    #[tokio::test]
    async fn test_detect_with_dead_view_is_browsing() {
        let slot = ViewSlot::new();
        slot.set(Some(Arc::new(FixedProbe {
            live: false,
            result: Ok(page("https://www.chess.com/puzzles")),
        })));
        let detector = StateDetector::new(slot);
        assert_eq!(detector.detect().await.mode, ActivityMode::Browsing);
    }

    #[tokio::test]
    async fn test_detect_swallows_probe_errors() {
        let slot = ViewSlot::new();
        slot.set(Some(Arc::new(FixedProbe {
            live: true,
            result: Err(ProbeError::Timeout),
        })));
        let detector = StateDetector::new(slot);
        assert_eq!(detector.detect().await.mode, ActivityMode::Browsing);
    }

    #[tokio::test]
    async fn test_detect_reads_slot_per_call() {
        let slot = ViewSlot::new();
        let detector = StateDetector::new(slot.clone());

        slot.set(Some(Arc::new(FixedProbe {
            live: true,
            result: Ok(page("https://www.chess.com/puzzles")),
        })));
        assert_eq!(detector.detect().await.mode, ActivityMode::Puzzles);

        slot.set(None);
        assert_eq!(detector.detect().await.mode, ActivityMode::Browsing);
    }
}
