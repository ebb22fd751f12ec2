//! User preferences persisted under [`SETTINGS_KEY`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    error::StorageError,
    storage::{SETTINGS_KEY, Storage},
};

/// Smallest accepted font size in pixels.
pub const MIN_FONT_SIZE: u8 = 10;
/// Largest accepted font size in pixels.
pub const MAX_FONT_SIZE: u8 = 32;

/// Colour scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// Parse a theme name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

/// Preferred assistant answer length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    /// A sentence or two.
    Short,
    /// A paragraph.
    #[default]
    Medium,
    /// As long as needed.
    Long,
}

impl ResponseLength {
    /// Parse a length name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "short" => Some(Self::Short),
            "medium" => Some(Self::Medium),
            "long" => Some(Self::Long),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        })
    }
}

/// Persisted user preferences.
///
/// Stored as `{"theme", "personality", "responseLength", "fontSize"}`.
/// Missing fields take their defaults so older blobs keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Colour scheme.
    pub theme: Theme,
    /// Assistant personality name.
    pub personality: String,
    /// Preferred answer length.
    pub response_length: ResponseLength,
    /// Font size in pixels.
    pub font_size: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            personality: "friendly".to_string(),
            response_length: ResponseLength::Medium,
            font_size: 14,
        }
    }
}

impl Settings {
    /// Load from `storage`.
    ///
    /// A missing, unreadable or corrupt value yields the defaults; the
    /// problem is logged, never returned.
    pub fn load(storage: &dyn Storage) -> Self {
        let raw = match storage.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(error) => {
                tracing::warn!(%error, "settings unreadable, using defaults");
                return Self::default();
            },
        };

        match serde_json::from_str::<Self>(&raw) {
            Ok(mut settings) => {
                settings.font_size = settings.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
                settings
            },
            Err(error) => {
                tracing::warn!(%error, "settings corrupt, using defaults");
                Self::default()
            },
        }
    }

    /// Persist to `storage`.
    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        storage.set(SETTINGS_KEY, &serde_json::to_string(self)?)
    }

    /// Preference and personality maps sent with `context_update`.
    pub fn context_fields(&self) -> (Value, Value) {
        let preferences = json!({ "responseLength": self.response_length.to_string() });
        let personality = json!({ "style": self.personality });
        (preferences, personality)
    }
}
