//! Theme preference over the durable store.

use shared::storage::{keys, DurableStore};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    fn from_flag(flag: &str) -> Theme {
        match flag {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }
}

pub struct Preferences {
    durable: Arc<dyn DurableStore>,
}

impl Preferences {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self { durable }
    }

    /// Defaults to dark when nothing is stored.
    pub fn theme(&self) -> Theme {
        self.durable
            .get(keys::THEME)
            .map(|flag| Theme::from_flag(&flag))
            .unwrap_or(Theme::Dark)
    }

    pub fn set_theme(&self, theme: Theme) {
        self.durable.set(keys::THEME, theme.as_str());
    }

    pub fn toggle_theme(&self) -> Theme {
        let next = match self.theme() {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
        self.set_theme(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::storage::MemoryStore;

    #[test]
    fn test_defaults_to_dark() {
        let prefs = Preferences::new(Arc::new(MemoryStore::new()));
        assert_eq!(prefs.theme(), Theme::Dark);
    }

    #[test]
    fn test_toggle_persists() {
        let durable = Arc::new(MemoryStore::new());
        let prefs = Preferences::new(durable.clone());
        assert_eq!(prefs.toggle_theme(), Theme::Light);
        assert_eq!(DurableStore::get(durable.as_ref(), keys::THEME), Some("light".to_string()));

        let reopened = Preferences::new(durable);
        assert_eq!(reopened.theme(), Theme::Light);
    }

    #[test]
    fn test_unknown_flag_falls_back_to_dark() {
        let durable = Arc::new(MemoryStore::new());
        DurableStore::set(durable.as_ref(), keys::THEME, "solarized");
        assert_eq!(Preferences::new(durable).theme(), Theme::Dark);
    }
}
