//! Gamification facade
//!
//! Wraps a [`QuizStore`] with derived values and a one-shot level-up
//! celebration latch for the presentation layer.

use chrono::NaiveDate;

use crate::consts::{XP_PER_CORRECT, XP_THRESHOLD};
use crate::persistence::{Storage, StorageError};
use crate::quiz::StoredQuiz;
use crate::store::{QuizStore, XpGain};

/// Level-up celebration latch.
///
/// Set by a rollover, cleared only by [`Gamification::acknowledge_level_up`].
/// Several level-ups before acknowledgment still mean one celebration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelUpCelebration {
    #[default]
    Acknowledged,
    Pending,
}

pub struct Gamification<S: Storage> {
    store: QuizStore<S>,
    celebration: LevelUpCelebration,
}

impl<S: Storage> Gamification<S> {
    pub fn new(store: QuizStore<S>) -> Self {
        Self {
            store,
            celebration: LevelUpCelebration::Acknowledged,
        }
    }

    /// Load the store from `storage` and wrap it
    pub fn load(storage: S) -> Self {
        Self::new(QuizStore::load(storage))
    }

    pub fn store(&self) -> &QuizStore<S> {
        &self.store
    }

    pub fn into_store(self) -> QuizStore<S> {
        self.store
    }

    pub fn experience_points(&self) -> u32 {
        self.store.gamification().experience_points
    }

    pub fn level(&self) -> u32 {
        self.store.gamification().level
    }

    pub fn streak(&self) -> u32 {
        self.store.gamification().streak
    }

    pub fn last_completion_date(&self) -> Option<&str> {
        self.store.gamification().last_completion_date.as_deref()
    }

    /// XP progress towards the next level, in `[0, 1)`
    pub fn progress_fraction(&self) -> f32 {
        self.store.gamification().progress_fraction()
    }

    pub fn xp_per_correct(&self) -> u32 {
        XP_PER_CORRECT
    }

    pub fn xp_threshold(&self) -> u32 {
        XP_THRESHOLD
    }

    pub fn add_experience(&mut self, points: i64) -> XpGain {
        let gain = self.store.add_experience(points);
        if gain.leveled_up {
            self.celebration = LevelUpCelebration::Pending;
        }
        gain
    }

    /// Award the XP for one correct answer
    pub fn award_correct_answer(&mut self) -> XpGain {
        self.add_experience(i64::from(XP_PER_CORRECT))
    }

    pub fn celebration(&self) -> LevelUpCelebration {
        self.celebration
    }

    pub fn level_up_pending(&self) -> bool {
        self.celebration == LevelUpCelebration::Pending
    }

    /// Dismiss the level-up celebration
    pub fn acknowledge_level_up(&mut self) {
        self.celebration = LevelUpCelebration::Acknowledged;
    }

    pub fn quizzes(&self) -> &[StoredQuiz] {
        self.store.quizzes()
    }

    pub fn quiz(&self, id: &str) -> Option<&StoredQuiz> {
        self.store.quiz(id)
    }

    pub fn add_or_replace_quiz(&mut self, quiz: StoredQuiz) {
        self.store.add_or_replace_quiz(quiz);
    }

    pub fn remove_quiz(&mut self, id: &str) -> bool {
        self.store.remove_quiz(id)
    }

    pub fn set_score(&mut self, id: &str, score: u32) -> bool {
        self.store.set_score(id, score)
    }

    pub fn record_completion(&mut self, score: u32) -> u32 {
        self.store.record_completion(score)
    }

    pub fn record_completion_on(&mut self, score: u32, today: NaiveDate) -> u32 {
        self.store.record_completion_on(score, today)
    }

    pub fn last_save_error(&self) -> Option<&StorageError> {
        self.store.last_save_error()
    }

    /// Re-read the store from storage; see [`QuizStore::reload`]
    pub fn reload(&mut self) -> bool {
        self.store.reload()
    }
}
