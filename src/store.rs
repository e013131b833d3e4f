//! Quiz library and gamification store
//!
//! Owns the canonical state and mirrors it to one storage key. Every mutation
//! is applied in memory first and then written as a single whole-record
//! write; a failed write is logged and remembered, never propagated.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::consts::{STORE_KEY, XP_THRESHOLD};
use crate::persistence::{Storage, StorageError, decode_record, encode_record};
use crate::quiz::StoredQuiz;

/// XP, level and streak progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationState {
    /// XP within the current level, always `< XP_THRESHOLD`
    pub experience_points: u32,
    /// Current level (starts at 1)
    pub level: u32,
    /// Consecutive days with at least one completed quiz
    pub streak: u32,
    /// Day key of the most recent completion (see [`day_key`])
    pub last_completion_date: Option<String>,
}

impl Default for GamificationState {
    fn default() -> Self {
        Self {
            experience_points: 0,
            level: 1,
            streak: 0,
            last_completion_date: None,
        }
    }
}

/// Result of adding experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpGain {
    /// At least one threshold was crossed
    pub leveled_up: bool,
    /// Number of thresholds crossed
    pub levels_gained: u32,
    pub experience_points: u32,
    pub level: u32,
}

impl GamificationState {
    /// Add XP with multi-level rollover; negative input counts as zero
    pub fn apply_experience(&mut self, points: i64) -> XpGain {
        let total = u64::from(self.experience_points) + points.max(0) as u64;
        let threshold = u64::from(XP_THRESHOLD);
        let levels_gained = u32::try_from(total / threshold).unwrap_or(u32::MAX);

        // Remainder is < XP_THRESHOLD, fits in u32
        self.experience_points = (total % threshold) as u32;
        self.level = self.level.saturating_add(levels_gained);

        XpGain {
            leveled_up: levels_gained > 0,
            levels_gained,
            experience_points: self.experience_points,
            level: self.level,
        }
    }

    /// Update the streak for a completion on `today`; returns the new streak.
    ///
    /// Same day: unchanged. Day after the last completion: +1. Otherwise: 1.
    pub fn apply_completion(&mut self, today: NaiveDate) -> u32 {
        let today_key = day_key(today);
        if self.last_completion_date.as_deref() == Some(today_key.as_str()) {
            return self.streak;
        }

        let continues = today
            .pred_opt()
            .map(day_key)
            .is_some_and(|yesterday| self.last_completion_date.as_deref() == Some(yesterday.as_str()));

        self.streak = if continues { self.streak.saturating_add(1) } else { 1 };
        self.last_completion_date = Some(today_key);
        self.streak
    }

    /// Clamp values read from storage back into range
    pub fn normalized(mut self) -> Self {
        self.level = self.level.max(1);
        if self.experience_points >= XP_THRESHOLD {
            self.apply_experience(0);
        }
        self
    }

    /// Fraction of the way to the next level, in `[0, 1)`
    pub fn progress_fraction(&self) -> f32 {
        self.experience_points as f32 / XP_THRESHOLD as f32
    }
}

/// Calendar-day key, formatted like JavaScript's `Date.toDateString()`
/// ("Mon Oct 19 2026") so existing browser records compare equal.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}

/// Today's date in the local timezone
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Everything the store persists
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreState {
    /// Most recent first
    pub quizzes: Vec<StoredQuiz>,
    pub gamification: GamificationState,
}

/// Canonical state plus its storage backend
pub struct QuizStore<S: Storage> {
    storage: S,
    key: String,
    state: StoreState,
    last_save_error: Option<StorageError>,
    /// Set while the stored record is unreadable; writes are skipped until a reload succeeds
    writes_held: bool,
}

/// Read and decode the record under `key`. A corrupt record is removed;
/// a backend read error is returned untouched.
fn read_state<S: Storage>(storage: &mut S, key: &str) -> Result<StoreState, StorageError> {
    let state = match storage.get_item(key)? {
        Some(raw) if !raw.is_empty() => match decode_record(&raw) {
            Ok(state) => {
                log::info!(
                    "Loaded {} quizzes (level {}, streak {})",
                    state.quizzes.len(),
                    state.gamification.level,
                    state.gamification.streak
                );
                state
            }
            Err(e) => {
                log::warn!("Discarding unreadable record '{}': {}", key, e);
                if let Err(e) = storage.remove_item(key) {
                    log::warn!("Failed to remove unreadable record '{}': {}", key, e);
                }
                StoreState::default()
            }
        },
        _ => {
            log::info!("No saved quizzes found, starting fresh");
            StoreState::default()
        }
    };
    Ok(state)
}

impl<S: Storage> QuizStore<S> {
    /// Load from the default key
    pub fn load(storage: S) -> Self {
        Self::load_with_key(storage, STORE_KEY)
    }

    /// Load from `key`, recovering from anything unreadable.
    ///
    /// A record that fails to parse is removed so the next load starts clean.
    /// If the backend itself cannot be read, the store runs on defaults in
    /// memory and writes nothing until [`QuizStore::reload`] succeeds.
    pub fn load_with_key(storage: S, key: impl Into<String>) -> Self {
        let mut store = Self {
            storage,
            key: key.into(),
            state: StoreState::default(),
            last_save_error: None,
            writes_held: false,
        };
        store.reload();
        store
    }

    /// Re-read the record from storage, replacing the in-memory state.
    ///
    /// Returns false if the backend could not be read; the current state is
    /// kept and writes stay held back.
    pub fn reload(&mut self) -> bool {
        match read_state(&mut self.storage, &self.key) {
            Ok(state) => {
                self.state = state;
                self.writes_held = false;
                self.last_save_error = None;
                true
            }
            Err(e) => {
                log::warn!("Storage read failed, changes will not be saved: {}", e);
                self.writes_held = true;
                self.last_save_error = Some(StorageError::NotLoaded {
                    key: self.key.clone(),
                    message: e.to_string(),
                });
                false
            }
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn gamification(&self) -> &GamificationState {
        &self.state.gamification
    }

    /// Saved quizzes, most recent first
    pub fn quizzes(&self) -> &[StoredQuiz] {
        &self.state.quizzes
    }

    pub fn quiz(&self, id: &str) -> Option<&StoredQuiz> {
        self.state.quizzes.iter().find(|q| q.id == id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Error from the most recent write (or the failed load), cleared by the
    /// next successful write or reload
    pub fn last_save_error(&self) -> Option<&StorageError> {
        self.last_save_error.as_ref()
    }

    /// Whether the stored copy matches memory as of the last write
    pub fn is_persisted(&self) -> bool {
        self.last_save_error.is_none()
    }

    /// Insert at the front, replacing any quiz with the same id
    pub fn add_or_replace_quiz(&mut self, quiz: StoredQuiz) {
        self.state.quizzes.retain(|q| q.id != quiz.id);
        self.state.quizzes.insert(0, quiz);
        self.persist();
    }

    /// Remove a quiz; returns false (and writes nothing) if the id is unknown
    pub fn remove_quiz(&mut self, id: &str) -> bool {
        let before = self.state.quizzes.len();
        self.state.quizzes.retain(|q| q.id != id);
        let removed = self.state.quizzes.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Set a quiz's score; returns false if the id is unknown
    pub fn set_score(&mut self, id: &str, score: u32) -> bool {
        let Some(quiz) = self.state.quizzes.iter_mut().find(|q| q.id == id) else {
            return false;
        };
        quiz.score = Some(score);
        self.persist();
        true
    }

    /// Add XP (negative counts as zero), rolling over as many levels as needed
    pub fn add_experience(&mut self, points: i64) -> XpGain {
        let before = self.state.gamification.clone();
        let gain = self.state.gamification.apply_experience(points);
        if gain.leveled_up {
            log::info!("Level up! Now level {}", gain.level);
        }
        if self.state.gamification != before {
            self.persist();
        }
        gain
    }

    /// Record a completed quiz today (local time); returns the streak.
    ///
    /// `score` does not gate the streak: any completion counts.
    pub fn record_completion(&mut self, score: u32) -> u32 {
        self.record_completion_on(score, local_today())
    }

    /// Record a completed quiz on a given day
    pub fn record_completion_on(&mut self, score: u32, today: NaiveDate) -> u32 {
        let before = self.state.gamification.last_completion_date.clone();
        let streak = self.state.gamification.apply_completion(today);
        if self.state.gamification.last_completion_date != before {
            log::info!("Quiz completed with score {}, streak {}", score, streak);
            self.persist();
        }
        streak
    }

    /// Write the whole record; failures are kept as a status, not returned
    fn persist(&mut self) {
        if self.writes_held {
            log::warn!("Not saving '{}': the stored record was never read", self.key);
            return;
        }
        let result = encode_record(&self.state)
            .map_err(|e| StorageError::WriteRejected {
                key: self.key.clone(),
                message: e.to_string(),
            })
            .and_then(|json| self.storage.set_item(&self.key, &json));

        match result {
            Ok(()) => {
                log::debug!("Store saved ({} quizzes)", self.state.quizzes.len());
                self.last_save_error = None;
            }
            Err(e) => {
                log::warn!("Failed to save store: {}", e);
                self.last_save_error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use crate::quiz::{Difficulty, QuizQuestion};
    use proptest::prelude::*;

    fn quiz(id: &str, transcript: &str) -> StoredQuiz {
        StoredQuiz {
            id: id.to_string(),
            video_id: "dQw4w9WgXcQ".to_string(),
            source_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            difficulty: Difficulty::Medium,
            requested_question_count: 1,
            created_at: 1_700_000_000_000,
            transcript: transcript.to_string(),
            questions: vec![QuizQuestion {
                prompt: "Q?".to_string(),
                options: vec!["A".into(), "B".into()],
                correct_option: "A".to_string(),
                explanation: String::new(),
            }],
            score: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store_with(xp: u32, level: u32) -> QuizStore<MemoryStorage> {
        let mut store = QuizStore::load(MemoryStorage::new());
        store.state.gamification.experience_points = xp;
        store.state.gamification.level = level;
        store
    }

    /// Backend whose reads or writes can be made to fail
    struct FullStorage {
        inner: MemoryStorage,
        reject_reads: bool,
        reject_writes: bool,
    }

    impl Storage for FullStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.reject_reads {
                return Err(StorageError::Unavailable("SecurityError".to_string()));
            }
            self.inner.get_item(key)
        }

        fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.reject_writes {
                return Err(StorageError::WriteRejected {
                    key: key.to_string(),
                    message: "QuotaExceededError".to_string(),
                });
            }
            self.inner.set_item(key, value)
        }

        fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key)
        }
    }

    #[test]
    fn test_fresh_store_defaults() {
        let store = QuizStore::load(MemoryStorage::new());
        assert_eq!(store.state(), &StoreState::default());
        assert_eq!(store.gamification().level, 1);
        assert!(store.is_persisted());
        // Loading alone writes nothing
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_multi_level_rollover() {
        let mut store = store_with(0, 1);
        let gain = store.add_experience(250);
        assert!(gain.leveled_up);
        assert_eq!(gain.levels_gained, 2);
        assert_eq!((gain.experience_points, gain.level), (50, 3));
    }

    #[test]
    fn test_single_level_rollover() {
        let mut store = store_with(80, 2);
        let gain = store.add_experience(30);
        assert!(gain.leveled_up);
        assert_eq!((gain.experience_points, gain.level), (10, 3));
    }

    #[test]
    fn test_no_level_up() {
        let mut store = store_with(50, 1);
        let gain = store.add_experience(10);
        assert!(!gain.leveled_up);
        assert_eq!((gain.experience_points, gain.level), (60, 1));
    }

    #[test]
    fn test_negative_xp_is_zero() {
        let mut negative = store_with(50, 2);
        let mut zero = store_with(50, 2);
        assert_eq!(negative.add_experience(-5), zero.add_experience(0));
        assert_eq!(negative.gamification().experience_points, 50);
        assert_eq!(negative.gamification().level, 2);
        assert!(negative.storage().is_empty());
    }

    #[test]
    fn test_exact_threshold() {
        let mut store = store_with(90, 1);
        let gain = store.add_experience(10);
        assert!(gain.leveled_up);
        assert_eq!((gain.experience_points, gain.level), (0, 2));
    }

    #[test]
    fn test_huge_xp_saturates_level() {
        let mut store = store_with(0, u32::MAX - 1);
        let gain = store.add_experience(i64::MAX);
        assert_eq!(gain.level, u32::MAX);
        assert!(gain.experience_points < XP_THRESHOLD);
    }

    #[test]
    fn test_streak_same_day_is_idempotent() {
        let mut store = QuizStore::load(MemoryStorage::new());
        assert_eq!(store.record_completion_on(3, day(2026, 10, 19)), 1);
        assert_eq!(store.record_completion_on(5, day(2026, 10, 19)), 1);
        assert_eq!(
            store.gamification().last_completion_date.as_deref(),
            Some("Mon Oct 19 2026")
        );
    }

    #[test]
    fn test_streak_consecutive_days_and_gap() {
        let mut store = QuizStore::load(MemoryStorage::new());
        assert_eq!(store.record_completion_on(1, day(2026, 2, 27)), 1);
        assert_eq!(store.record_completion_on(1, day(2026, 2, 28)), 2);
        // Month boundary
        assert_eq!(store.record_completion_on(1, day(2026, 3, 1)), 3);
        // Skip Mar 2
        assert_eq!(store.record_completion_on(1, day(2026, 3, 3)), 1);
        assert_eq!(store.record_completion_on(1, day(2026, 3, 4)), 2);
    }

    #[test]
    fn test_zero_score_still_counts() {
        let mut store = QuizStore::load(MemoryStorage::new());
        assert_eq!(store.record_completion_on(0, day(2026, 1, 1)), 1);
    }

    #[test]
    fn test_streak_continues_from_browser_record() {
        let raw = r#"{"quizzes":[],"xp":0,"level":1,"streak":6,"lastCompletionDate":"Sun Oct 18 2026"}"#;
        let mut store = QuizStore::load(MemoryStorage::with_item(STORE_KEY, raw));
        assert_eq!(store.record_completion_on(2, day(2026, 10, 19)), 7);
    }

    #[test]
    fn test_add_or_replace_promotes_to_front() {
        let mut store = QuizStore::load(MemoryStorage::new());
        store.add_or_replace_quiz(quiz("a", "first"));
        store.add_or_replace_quiz(quiz("b", "other"));
        store.add_or_replace_quiz(quiz("a", "second"));

        let ids: Vec<_> = store.quizzes().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(store.quiz("a").unwrap().transcript, "second");
    }

    #[test]
    fn test_remove_and_score_unknown_ids_are_noops() {
        let mut store = QuizStore::load(MemoryStorage::new());
        assert!(!store.remove_quiz("nope"));
        assert!(!store.set_score("nope", 3));
        assert!(store.storage().is_empty());

        store.add_or_replace_quiz(quiz("a", "t"));
        assert!(store.set_score("a", 3));
        assert_eq!(store.quiz("a").unwrap().score, Some(3));
        assert!(store.remove_quiz("a"));
        assert!(store.quizzes().is_empty());
    }

    #[test]
    fn test_mutations_persist_and_reload() {
        let mut store = QuizStore::load(MemoryStorage::new());
        store.add_or_replace_quiz(quiz("a", "t"));
        store.set_score("a", 1);
        store.add_experience(120);
        store.record_completion_on(1, day(2026, 10, 19));

        let reloaded = QuizStore::load(store.into_storage());
        assert_eq!(reloaded.quizzes().len(), 1);
        assert_eq!(reloaded.quiz("a").unwrap().score, Some(1));
        assert_eq!(reloaded.gamification().experience_points, 20);
        assert_eq!(reloaded.gamification().level, 2);
        assert_eq!(reloaded.gamification().streak, 1);
    }

    #[test]
    fn test_malformed_record_is_cleared() {
        let storage = MemoryStorage::with_item(STORE_KEY, "{definitely not json");
        let store = QuizStore::load(storage);
        assert_eq!(store.state(), &StoreState::default());

        let storage = store.into_storage();
        assert!(!storage.contains_key(STORE_KEY));
        let again = QuizStore::load(storage);
        assert_eq!(again.state(), &StoreState::default());
    }

    #[test]
    fn test_wrongly_typed_field_keeps_progress() {
        let mut bad = serde_json::to_value(quiz("bad", "t")).unwrap();
        bad["score"] = serde_json::json!("3");
        let good = serde_json::to_value(quiz("good", "t")).unwrap();
        let raw = serde_json::json!({
            "quizzes": [bad, good],
            "xp": 40,
            "level": 7,
            "streak": 12,
            "lastCompletionDate": "Sun Oct 18 2026"
        })
        .to_string();

        let store = QuizStore::load(MemoryStorage::with_item(STORE_KEY, &raw));
        let g = store.gamification();
        assert_eq!((g.experience_points, g.level, g.streak), (40, 7, 12));
        assert_eq!(g.last_completion_date.as_deref(), Some("Sun Oct 18 2026"));
        let ids: Vec<_> = store.quizzes().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["good"]);
        // Loading does not touch the stored record
        assert_eq!(store.storage().get_item(STORE_KEY).unwrap().as_deref(), Some(raw.as_str()));
    }

    #[test]
    fn test_read_failure_holds_writes() {
        let raw = r#"{"quizzes":[],"xp":40,"level":7,"streak":12}"#;
        let storage = FullStorage {
            inner: MemoryStorage::with_item(STORE_KEY, raw),
            reject_reads: true,
            reject_writes: false,
        };
        let mut store = QuizStore::load(storage);
        assert_eq!(store.state(), &StoreState::default());
        assert!(!store.is_persisted());
        assert!(matches!(
            store.last_save_error(),
            Some(StorageError::NotLoaded { .. })
        ));

        store.add_experience(30);
        store.add_or_replace_quiz(quiz("a", "t"));
        assert_eq!(store.gamification().experience_points, 30);
        assert_eq!(store.storage().inner.get_item(STORE_KEY).unwrap().as_deref(), Some(raw));

        // Still unreadable
        assert!(!store.reload());
        assert_eq!(store.gamification().experience_points, 30);

        store.storage.reject_reads = false;
        assert!(store.reload());
        assert!(store.is_persisted());
        assert_eq!(store.gamification().level, 7);
        store.add_experience(10);
        let reloaded = QuizStore::load(store.into_storage().inner);
        assert_eq!(reloaded.gamification().experience_points, 50);
        assert_eq!(reloaded.gamification().level, 7);
    }

    #[test]
    fn test_legacy_array_record() {
        let a = serde_json::to_string(&quiz("a", "ta")).unwrap();
        let b = serde_json::to_string(&quiz("b", "tb")).unwrap();
        let raw = format!("[{},{}]", a, b);
        let store = QuizStore::load(MemoryStorage::with_item(STORE_KEY, &raw));

        let ids: Vec<_> = store.quizzes().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(store.gamification(), &GamificationState::default());
    }

    #[test]
    fn test_empty_value_is_absent() {
        let store = QuizStore::load(MemoryStorage::with_item(STORE_KEY, ""));
        assert_eq!(store.state(), &StoreState::default());
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let storage = FullStorage {
            inner: MemoryStorage::new(),
            reject_reads: false,
            reject_writes: true,
        };
        let mut store = QuizStore::load(storage);

        let gain = store.add_experience(110);
        assert!(gain.leveled_up);
        assert_eq!(store.gamification().level, 2);
        assert!(!store.is_persisted());
        assert!(matches!(
            store.last_save_error(),
            Some(StorageError::WriteRejected { .. })
        ));

        store.storage.reject_writes = false;
        store.add_experience(10);
        assert!(store.is_persisted());
        assert!(store.storage().inner.contains_key(STORE_KEY));
    }

    #[test]
    fn test_day_key_format() {
        assert_eq!(day_key(day(2026, 10, 5)), "Mon Oct 05 2026");
        assert_eq!(day_key(day(2024, 2, 29)), "Thu Feb 29 2024");
    }

    proptest! {
        #[test]
        fn prop_xp_stays_below_threshold(start in 0u32..XP_THRESHOLD, level in 1u32..1000, points in 0i64..1_000_000) {
            let mut state = GamificationState { experience_points: start, level, ..Default::default() };
            let gain = state.apply_experience(points);
            prop_assert!(gain.experience_points < XP_THRESHOLD);
            // No XP is lost across the rollover
            let before = u64::from(level) * u64::from(XP_THRESHOLD) + u64::from(start) + points as u64;
            let after = u64::from(gain.level) * u64::from(XP_THRESHOLD) + u64::from(gain.experience_points);
            prop_assert_eq!(before, after);
            prop_assert_eq!(gain.leveled_up, gain.level > level);
        }
    }
}
