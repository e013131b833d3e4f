//! QuizPool - YouTube transcript quizzes with XP, levels and daily streaks
//!
//! Core modules:
//! - `store`: Quiz library and gamification state, mirrored to storage
//! - `gamification`: Derived progress and the level-up celebration latch
//! - `player`: Play-through of a single quiz
//! - `persistence`: Storage port, backends, record decoding
//! - `api`: Quiz generation service client
//! - `settings`: User preferences

pub mod api;
pub mod gamification;
pub mod persistence;
pub mod player;
pub mod quiz;
pub mod settings;
pub mod store;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use gamification::{Gamification, LevelUpCelebration};
pub use persistence::{MemoryStorage, Storage, StorageError};
pub use player::{AnswerOutcome, Completion, PlayerPhase, QuizPlayer};
pub use quiz::{Difficulty, QuizQuestion, StoredQuiz, TranscriptSegment};
pub use settings::Settings;
pub use store::{GamificationState, QuizStore, StoreState, XpGain};

/// Application constants
pub mod consts {
    /// XP awarded per correct answer
    pub const XP_PER_CORRECT: u32 = 10;
    /// XP needed to go up one level
    pub const XP_THRESHOLD: u32 = 100;

    /// Storage key of the quiz library + gamification record
    pub const STORE_KEY: &str = "quizpoolai.quizzes";
    /// Storage key of the user settings
    pub const SETTINGS_KEY: &str = "quizpoolai.settings";

    /// Generation service used when nothing else is configured
    pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

    /// Question count bounds accepted by the generation service
    pub const MIN_QUESTIONS: u32 = 1;
    pub const MAX_QUESTIONS: u32 = 50;
    pub const DEFAULT_QUESTIONS: u32 = 5;

    /// Transcript characters shown collapsed / expanded
    pub const TRANSCRIPT_PREVIEW_CHARS: usize = 320;
    pub const TRANSCRIPT_EXPANDED_CHARS: usize = 2000;
}
