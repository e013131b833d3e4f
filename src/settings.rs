//! User preferences
//!
//! Persisted separately from the quiz library, under their own storage key.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_API_BASE, DEFAULT_QUESTIONS, MAX_QUESTIONS, MIN_QUESTIONS, SETTINGS_KEY};
use crate::persistence::{Storage, StorageError};
use crate::quiz::Difficulty;

/// Environment variable overriding the API base URL (native)
pub const API_BASE_ENV: &str = "QUIZPOOL_API_BASE";

/// Generation defaults and service location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Base URL of the quiz generation service
    pub api_base: String,
    /// Questions requested per quiz
    pub num_questions: u32,
    /// Difficulty requested per quiz
    pub difficulty: Difficulty,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            num_questions: DEFAULT_QUESTIONS,
            difficulty: Difficulty::Medium,
        }
    }
}

impl Settings {
    /// Set the question count, clamped to what the service accepts
    pub fn set_num_questions(&mut self, n: u32) {
        self.num_questions = n.clamp(MIN_QUESTIONS, MAX_QUESTIONS);
    }

    pub fn set_api_base(&mut self, url: &str) {
        let url = url.trim().trim_end_matches('/');
        self.api_base = if url.is_empty() {
            DEFAULT_API_BASE.to_string()
        } else {
            url.to_string()
        };
    }

    /// Apply `QUIZPOOL_API_BASE` if set
    #[cfg(not(target_arch = "wasm32"))]
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_BASE_ENV) {
            log::info!("Using API base from {}", API_BASE_ENV);
            self.set_api_base(&url);
        }
    }

    /// Load settings; anything missing or unreadable falls back to defaults
    pub fn load<S: Storage>(storage: &S) -> Self {
        match storage.get_item(SETTINGS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Settings>(&json) {
                Ok(mut settings) => {
                    settings.set_num_questions(settings.num_questions);
                    log::info!("Loaded settings");
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable settings: {}", e);
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Settings unavailable, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn save<S: Storage>(&self, storage: &mut S) -> Result<(), StorageError> {
        let json = serde_json::to_string(self).map_err(|e| StorageError::WriteRejected {
            key: SETTINGS_KEY.to_string(),
            message: e.to_string(),
        })?;
        storage.set_item(SETTINGS_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
