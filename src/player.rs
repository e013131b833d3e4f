//! Quiz play-through
//!
//! Steps through one stored quiz question by question. Correct answers bump
//! the quiz's score and award XP; reaching the end records a completion once
//! per play-through. The gamification facade is passed into each call, so the
//! player holds no reference to it.

use serde::Serialize;

use crate::consts::XP_PER_CORRECT;
use crate::gamification::Gamification;
use crate::persistence::Storage;
use crate::quiz::{QuizQuestion, StoredQuiz};
use crate::store::XpGain;

/// Where the player is within the current question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerPhase {
    /// Waiting for an answer
    Answering,
    /// Answer chosen, feedback showing
    Reviewing,
    /// Past the last question
    Complete,
}

/// Outcome of selecting an option
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    pub selected: usize,
    pub correct_option: String,
    pub explanation: String,
    /// Score after this answer
    pub score: u32,
    /// XP awarded (only for correct answers)
    pub xp: Option<XpGain>,
}

/// Emitted once when the last question is passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub score: u32,
    pub total: usize,
    pub streak: u32,
}

#[derive(Debug, Clone)]
pub struct QuizPlayer {
    quiz_id: String,
    questions: Vec<QuizQuestion>,
    current: usize,
    selected: Option<usize>,
    last_correct: Option<bool>,
    score: u32,
    completion_logged: bool,
}

impl QuizPlayer {
    /// Start at the first question, carrying over the quiz's stored score
    pub fn new(quiz: &StoredQuiz) -> Self {
        Self {
            quiz_id: quiz.id.clone(),
            questions: quiz.questions.clone(),
            current: 0,
            selected: None,
            last_correct: None,
            score: quiz.score.unwrap_or(0),
            completion_logged: false,
        }
    }

    /// Look the quiz up in the library and start it
    pub fn start<S: Storage>(game: &Gamification<S>, quiz_id: &str) -> Option<Self> {
        game.quiz(quiz_id).map(Self::new)
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn phase(&self) -> PlayerPhase {
        if self.is_complete() {
            PlayerPhase::Complete
        } else if self.selected.is_some() {
            PlayerPhase::Reviewing
        } else {
            PlayerPhase::Answering
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Whether the current selection was correct (`None` before answering)
    pub fn last_correct(&self) -> Option<bool> {
        self.last_correct
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    /// Answer the current question.
    ///
    /// Ignored (returns `None`) once an option is selected, after completion,
    /// or for an out-of-range index.
    pub fn select<S: Storage>(
        &mut self,
        game: &mut Gamification<S>,
        index: usize,
    ) -> Option<AnswerOutcome> {
        if self.selected.is_some() {
            return None;
        }
        let question = self.questions.get(self.current)?;
        if index >= question.options.len() {
            return None;
        }

        let correct = question.is_correct(index);
        let correct_option = question.correct_option.clone();
        let explanation = question.explanation.clone();
        self.selected = Some(index);
        self.last_correct = Some(correct);

        let xp = if correct {
            self.score += 1;
            game.set_score(&self.quiz_id, self.score);
            let gain = game.award_correct_answer();
            log::debug!("Correct! +{} XP", XP_PER_CORRECT);
            Some(gain)
        } else {
            None
        };

        Some(AnswerOutcome {
            correct,
            selected: index,
            correct_option,
            explanation,
            score: self.score,
            xp,
        })
    }

    /// Move on. The last question completes the quiz even unanswered;
    /// earlier questions need an answer first.
    pub fn advance<S: Storage>(&mut self, game: &mut Gamification<S>) -> Option<Completion> {
        if self.is_complete() {
            // Only an empty quiz can still be waiting for its completion here
            return self.log_completion(game);
        }
        if self.current + 1 >= self.questions.len() {
            self.current = self.questions.len();
            self.selected = None;
            self.last_correct = None;
            return self.log_completion(game);
        }
        if self.selected.is_some() {
            self.current += 1;
            self.selected = None;
            self.last_correct = None;
        }
        None
    }

    /// Back to the first question with a zero score
    pub fn restart<S: Storage>(&mut self, game: &mut Gamification<S>) {
        self.current = 0;
        self.selected = None;
        self.last_correct = None;
        self.score = 0;
        self.completion_logged = false;
        game.set_score(&self.quiz_id, 0);
    }

    pub fn share_text(&self) -> String {
        format!(
            "I just scored {}/{} on QuizPoolAI!",
            self.score,
            self.questions.len()
        )
    }

    fn log_completion<S: Storage>(&mut self, game: &mut Gamification<S>) -> Option<Completion> {
        if self.completion_logged {
            return None;
        }
        self.completion_logged = true;
        let streak = game.record_completion(self.score);
        Some(Completion {
            score: self.score,
            total: self.questions.len(),
            streak,
        })
    }
}
