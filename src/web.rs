//! Browser bindings (wasm32 only)
//!
//! `QuizPool` owns the gamification store backed by LocalStorage and the
//! current play-through. Structured values cross the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::api::QuizClient;
use crate::gamification::Gamification;
use crate::persistence::LocalStorage;
use crate::player::QuizPlayer;
use crate::quiz::{Difficulty, StoredQuiz, format_created_at};
use crate::settings::Settings;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_ok() {
        log::info!("QuizPool starting...");
    }
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_error)
}

/// Generate a quiz; resolves to the `StoredQuiz` JSON, rejects with a user-facing message
#[wasm_bindgen(js_name = generateQuiz)]
pub async fn generate_quiz(
    api_base: String,
    youtube_url: String,
    num_questions: u32,
    difficulty: String,
) -> Result<String, JsValue> {
    let difficulty = Difficulty::parse(&difficulty).map_err(js_error)?;
    let created_at = js_sys::Date::now() as i64;
    let quiz = QuizClient::new(&api_base)
        .create_quiz(&youtube_url, num_questions, difficulty, created_at)
        .await
        .map_err(js_error)?;
    to_json(&quiz)
}

#[wasm_bindgen]
pub struct QuizPool {
    game: Gamification<LocalStorage>,
    settings: Settings,
    settings_storage: LocalStorage,
    player: Option<QuizPlayer>,
}

#[wasm_bindgen]
impl QuizPool {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<QuizPool, JsValue> {
        let game = Gamification::load(LocalStorage::open().map_err(js_error)?);
        let settings_storage = LocalStorage::open().map_err(js_error)?;
        let settings = Settings::load(&settings_storage);
        Ok(Self {
            game,
            settings,
            settings_storage,
            player: None,
        })
    }

    // === Progress ===

    #[wasm_bindgen(getter)]
    pub fn xp(&self) -> u32 {
        self.game.experience_points()
    }

    #[wasm_bindgen(getter)]
    pub fn level(&self) -> u32 {
        self.game.level()
    }

    #[wasm_bindgen(getter)]
    pub fn streak(&self) -> u32 {
        self.game.streak()
    }

    #[wasm_bindgen(getter, js_name = xpProgress)]
    pub fn xp_progress(&self) -> f32 {
        self.game.progress_fraction()
    }

    #[wasm_bindgen(getter, js_name = xpThreshold)]
    pub fn xp_threshold(&self) -> u32 {
        self.game.xp_threshold()
    }

    #[wasm_bindgen(getter, js_name = xpPerCorrect)]
    pub fn xp_per_correct(&self) -> u32 {
        self.game.xp_per_correct()
    }

    #[wasm_bindgen(getter, js_name = levelUpVisible)]
    pub fn level_up_visible(&self) -> bool {
        self.game.level_up_pending()
    }

    /// Set when the last write to LocalStorage failed
    #[wasm_bindgen(getter, js_name = saveError)]
    pub fn save_error(&self) -> Option<String> {
        self.game.last_save_error().map(|e| e.to_string())
    }

    #[wasm_bindgen(js_name = closeLevelUpModal)]
    pub fn close_level_up_modal(&mut self) {
        self.game.acknowledge_level_up();
    }

    /// Returns the `XpGain` JSON
    #[wasm_bindgen(js_name = addXp)]
    pub fn add_xp(&mut self, points: i32) -> Result<String, JsValue> {
        to_json(&self.game.add_experience(i64::from(points)))
    }

    #[wasm_bindgen(js_name = completeQuiz)]
    pub fn complete_quiz(&mut self, score: u32) -> u32 {
        self.game.record_completion(score)
    }

    // === Library ===

    #[wasm_bindgen(js_name = quizzesJson)]
    pub fn quizzes_json(&self) -> Result<String, JsValue> {
        to_json(&self.game.quizzes())
    }

    #[wasm_bindgen(js_name = quizJson)]
    pub fn quiz_json(&self, id: &str) -> Result<Option<String>, JsValue> {
        self.game.quiz(id).map(to_json).transpose()
    }

    /// Add a quiz from its JSON (as resolved by `generateQuiz`)
    #[wasm_bindgen(js_name = addQuiz)]
    pub fn add_quiz(&mut self, json: &str) -> Result<String, JsValue> {
        let quiz: StoredQuiz = serde_json::from_str(json).map_err(js_error)?;
        let id = quiz.id.clone();
        self.game.add_or_replace_quiz(quiz);
        Ok(id)
    }

    #[wasm_bindgen(js_name = removeQuiz)]
    pub fn remove_quiz(&mut self, id: &str) -> bool {
        if self.player.as_ref().is_some_and(|p| p.quiz_id() == id) {
            self.player = None;
        }
        self.game.remove_quiz(id)
    }

    #[wasm_bindgen(js_name = updateScore)]
    pub fn update_score(&mut self, id: &str, score: u32) -> bool {
        self.game.set_score(id, score)
    }

    /// Transcript preview of a saved quiz (320 characters, 2000 expanded)
    #[wasm_bindgen(js_name = transcriptPreview)]
    pub fn transcript_preview(&self, id: &str, expanded: bool) -> Option<String> {
        self.game
            .quiz(id)
            .map(|quiz| quiz.transcript_preview(expanded).to_string())
    }

    #[wasm_bindgen(js_name = transcriptTruncated)]
    pub fn transcript_truncated(&self, id: &str, expanded: bool) -> bool {
        self.game
            .quiz(id)
            .is_some_and(|quiz| quiz.transcript_truncated(expanded))
    }

    /// Returns `[{ text, matched }, ...]` JSON for the preview searched with `query`
    #[wasm_bindgen(js_name = transcriptSegments)]
    pub fn transcript_segments(
        &self,
        id: &str,
        expanded: bool,
        query: &str,
    ) -> Result<Option<String>, JsValue> {
        self.game
            .quiz(id)
            .map(|quiz| to_json(&quiz.transcript_segments(expanded, query)))
            .transpose()
    }

    /// Re-read the library after a failed load; true once it succeeds
    #[wasm_bindgen(js_name = reloadStore)]
    pub fn reload_store(&mut self) -> bool {
        self.game.reload()
    }

    /// Relative creation label for a quiz card
    #[wasm_bindgen(js_name = createdLabel)]
    pub fn created_label(&self, created_at: f64) -> String {
        format_created_at(created_at as i64, js_sys::Date::now() as i64)
    }

    // === Player ===

    #[wasm_bindgen(js_name = startQuiz)]
    pub fn start_quiz(&mut self, id: &str) -> bool {
        self.player = QuizPlayer::start(&self.game, id);
        self.player.is_some()
    }

    /// Returns the `AnswerOutcome` JSON, or nothing if the selection was ignored
    #[wasm_bindgen(js_name = selectAnswer)]
    pub fn select_answer(&mut self, index: usize) -> Result<Option<String>, JsValue> {
        let Some(player) = self.player.as_mut() else {
            return Ok(None);
        };
        player.select(&mut self.game, index).as_ref().map(to_json).transpose()
    }

    /// Returns the `Completion` JSON when this step finished the quiz
    #[wasm_bindgen(js_name = nextQuestion)]
    pub fn next_question(&mut self) -> Result<Option<String>, JsValue> {
        let Some(player) = self.player.as_mut() else {
            return Ok(None);
        };
        player.advance(&mut self.game).as_ref().map(to_json).transpose()
    }

    #[wasm_bindgen(js_name = restartQuiz)]
    pub fn restart_quiz(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.restart(&mut self.game);
        }
    }

    #[wasm_bindgen(getter, js_name = currentIndex)]
    pub fn current_index(&self) -> usize {
        self.player.as_ref().map_or(0, |p| p.current_index())
    }

    #[wasm_bindgen(getter, js_name = quizComplete)]
    pub fn quiz_complete(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.is_complete())
    }

    #[wasm_bindgen(js_name = shareText)]
    pub fn share_text(&self) -> Option<String> {
        self.player.as_ref().map(|p| p.share_text())
    }

    // === Settings ===

    #[wasm_bindgen(getter, js_name = apiBase)]
    pub fn api_base(&self) -> String {
        self.settings.api_base.clone()
    }

    #[wasm_bindgen(getter, js_name = numQuestions)]
    pub fn num_questions(&self) -> u32 {
        self.settings.num_questions
    }

    #[wasm_bindgen(getter)]
    pub fn difficulty(&self) -> String {
        self.settings.difficulty.as_str().to_string()
    }

    /// Update and persist the generation defaults; an unknown difficulty
    /// rejects the whole update
    #[wasm_bindgen(js_name = updateSettings)]
    pub fn update_settings(
        &mut self,
        api_base: Option<String>,
        num_questions: Option<u32>,
        difficulty: Option<String>,
    ) -> Result<(), JsValue> {
        let difficulty = difficulty
            .as_deref()
            .map(Difficulty::parse)
            .transpose()
            .map_err(js_error)?;
        if let Some(url) = api_base {
            self.settings.set_api_base(&url);
        }
        if let Some(n) = num_questions {
            self.settings.set_num_questions(n);
        }
        if let Some(d) = difficulty {
            self.settings.difficulty = d;
        }
        self.settings.save(&mut self.settings_storage).map_err(js_error)
    }
}
