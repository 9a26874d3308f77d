//! Scene snapshot and the location keyword heuristic.

use serde::{Deserialize, Serialize};

use crate::symbols::normalize;

/// Where the conversation is taking place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Virtual,
    Home,
    Office,
}

impl Location {
    /// Keyword groups, scanned in this order.
    const GROUPS: [(Location, &'static [&'static str]); 2] = [
        (Location::Home, &["家", "回", "home"]),
        (Location::Office, &["公司", "办公室", "office"]),
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Virtual => "virtual",
            Self::Home => "home",
            Self::Office => "office",
        }
    }

    /// First location whose keywords occur in `text`.
    pub fn detect(text: &str) -> Option<Self> {
        let text = normalize(text);
        Self::GROUPS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
            .map(|(location, _)| *location)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Who/what/when/where of the current turn. No history is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneState {
    pub actor: String,
    pub activity: String,
    pub time: String,
    pub location: Location,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            actor: "user".into(),
            activity: "IDLE".into(),
            time: "now".into(),
            location: Location::Virtual,
        }
    }
}

impl SceneState {
    /// Update the location from `text`; unchanged when no keyword occurs.
    pub fn observe(&mut self, text: &str) {
        if let Some(location) = Location::detect(text) {
            if location != self.location {
                tracing::debug!(from = %self.location, to = %location, "scene location changed");
            }
            self.location = location;
        }
    }
}
