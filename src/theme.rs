//! Cosmetic CSS: page themes and hide/show toggles for chess.com elements.
//!
//! The webview exposes no insertCSS, so every stylesheet is applied by
//! evaluating a script that upserts a `<style>` element keyed by slot.

use serde::{Deserialize, Serialize};

/// Selector for the live-game chat sidebar.
pub const CHAT_SELECTOR: &str = ".resizable-chat-area-component";
/// Selector for player rating badges.
pub const RATINGS_SELECTOR: &str = ".user-rating-component";

/// Style slots: one `<style>` element per concern so toggles never clobber
/// each other.
pub const CHAT_STYLE_SLOT: &str = "chat";
pub const RATINGS_STYLE_SLOT: &str = "ratings";
pub const THEME_STYLE_SLOT: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemeId {
    #[default]
    Default,
    Dark,
    Crimson,
    Nebula,
}

pub struct Theme {
    pub id: ThemeId,
    pub name: &'static str,
    /// Background override injected into the page, if the theme has one.
    pub background_css: Option<&'static str>,
}

pub static THEMES: [Theme; 4] = [
    Theme {
        id: ThemeId::Default,
        name: "Default",
        background_css: None,
    },
    Theme {
        id: ThemeId::Dark,
        name: "Dark",
        background_css: Some("#1b1a17"),
    },
    Theme {
        id: ThemeId::Crimson,
        name: "Crimson",
        background_css: Some("#3a1010"),
    },
    Theme {
        id: ThemeId::Nebula,
        name: "Nebula",
        background_css: Some("#181032"),
    },
];

pub fn theme(id: ThemeId) -> &'static Theme {
    THEMES
        .iter()
        .find(|t| t.id == id)
        .unwrap_or(&THEMES[0])
}

pub fn build_hide_css(selector: &str) -> String {
    format!("{selector} {{ display: none !important; }}")
}

pub fn build_show_css(selector: &str) -> String {
    format!("{selector} {{ display: block !important; }}")
}

pub fn build_theme_css(id: ThemeId) -> String {
    match theme(id).background_css {
        Some(color) => format!(
            ":root {{ --theme-background-override: {color} !important; }}\n\
             body {{ background-color: {color} !important; }}"
        ),
        None => String::new(),
    }
}

/// Script that creates or replaces the `<style>` element for a slot. The CSS
/// is JSON-escaped so arbitrary rules survive the round trip into the page.
pub fn build_style_injection_script(slot: &str, css: &str) -> String {
    let id = format!("chess-desktop-style-{slot}");
    let escaped = serde_json::to_string(css).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{\n\
           let el = document.getElementById('{id}');\n\
           if (!el) {{\n\
             el = document.createElement('style');\n\
             el.id = '{id}';\n\
             document.head.appendChild(el);\n\
           }}\n\
           el.textContent = {escaped};\n\
         }})();"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hide_and_show_css() {
        assert_eq!(
            build_hide_css(CHAT_SELECTOR),
            ".resizable-chat-area-component { display: none !important; }"
        );
        assert!(build_show_css(RATINGS_SELECTOR).contains("display: block"));
    }

    #[test]
    fn test_default_theme_has_no_override() {
        assert!(build_theme_css(ThemeId::Default).is_empty());
        assert!(build_theme_css(ThemeId::Dark).contains("#1b1a17"));
    }

    #[test]
    fn test_theme_lookup_covers_all_ids() {
        for id in [
            ThemeId::Default,
            ThemeId::Dark,
            ThemeId::Crimson,
            ThemeId::Nebula,
        ] {
            assert_eq!(theme(id).id, id);
        }
    }

    #[test]
    fn test_injection_script_escapes_css() {
        let script = build_style_injection_script("chat", "a { content: \"x\"; }");
        assert!(script.contains("chess-desktop-style-chat"));
        assert!(script.contains("\\\"x\\\""));
        assert!(script.contains("document.createElement('style')"));
    }
}
