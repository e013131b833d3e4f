//! Persisted store record
//!
//! Two shapes exist in the wild: a bare array of quizzes (the first release
//! stored only the library) and the structured record carrying the
//! gamification fields. Both resolve to one `StoreState` right here.
//!
//! Only a value that is not JSON, or whose top level is neither an array nor
//! an object, is corrupt. Inside a readable record each field is taken on its
//! own: a missing or wrongly typed field falls back to its default and a quiz
//! entry that does not decode is skipped.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::quiz::StoredQuiz;
use crate::store::{GamificationState, StoreState};

/// Why a stored value could not be used at all
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("expected an array or object, found {0}")]
    Shape(&'static str),
}

/// Record as read from storage, before normalization
#[derive(Debug)]
pub enum PersistedRecord {
    /// `[quiz, quiz, ...]`
    Legacy(Vec<Value>),
    /// `{ quizzes, xp, level, streak, lastCompletionDate }` with any field missing
    Structured(Map<String, Value>),
}

impl PersistedRecord {
    pub fn parse(raw: &str) -> Result<Self, RecordError> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Array(entries) => Ok(PersistedRecord::Legacy(entries)),
            Value::Object(fields) => Ok(PersistedRecord::Structured(fields)),
            Value::Null => Err(RecordError::Shape("null")),
            Value::Bool(_) => Err(RecordError::Shape("a boolean")),
            Value::Number(_) => Err(RecordError::Shape("a number")),
            Value::String(_) => Err(RecordError::Shape("a string")),
        }
    }

    /// Resolve to the canonical state; unusable fields take their defaults
    pub fn into_state(self) -> StoreState {
        match self {
            PersistedRecord::Legacy(entries) => StoreState {
                quizzes: decode_quizzes(entries),
                gamification: GamificationState::default(),
            },
            PersistedRecord::Structured(mut fields) => {
                let defaults = GamificationState::default();
                let xp = fields.remove("xp").or_else(|| fields.remove("experiencePoints"));
                let gamification = GamificationState {
                    experience_points: counter(xp, "xp").unwrap_or(defaults.experience_points),
                    level: counter(fields.remove("level"), "level").unwrap_or(defaults.level),
                    streak: counter(fields.remove("streak"), "streak").unwrap_or(defaults.streak),
                    last_completion_date: completion_day(fields.remove("lastCompletionDate")),
                }
                .normalized();

                let quizzes = match fields.remove("quizzes") {
                    Some(Value::Array(entries)) => decode_quizzes(entries),
                    None | Some(Value::Null) => Vec::new(),
                    Some(other) => {
                        log::warn!("Ignoring 'quizzes' field that is not a list: {}", other);
                        Vec::new()
                    }
                };
                StoreState { quizzes, gamification }
            }
        }
    }
}

/// Decode quizzes one at a time, dropping the ones that do not fit
fn decode_quizzes(entries: Vec<Value>) -> Vec<StoredQuiz> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<StoredQuiz>(entry) {
            Ok(quiz) => Some(quiz),
            Err(e) => {
                log::warn!("Skipping unreadable quiz at index {}: {}", i, e);
                None
            }
        })
        .collect()
}

/// Non-negative integer field; whole floats like `40.0` count
fn counter(value: Option<Value>, name: &str) -> Option<u32> {
    let value = value.filter(|v| !v.is_null())?;
    let parsed = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .and_then(|n| u32::try_from(n).ok());
    if parsed.is_none() {
        log::warn!("Ignoring '{}' field with unusable value {}", name, value);
    }
    parsed
}

fn completion_day(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => {
            log::warn!("Ignoring 'lastCompletionDate' field with unusable value {}", other);
            None
        }
    }
}

/// Borrowed view used for writing; always the structured shape
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordRef<'a> {
    quizzes: &'a [StoredQuiz],
    xp: u32,
    level: u32,
    streak: u32,
    last_completion_date: Option<&'a str>,
}

/// Parse a stored value into canonical state
pub fn decode_record(raw: &str) -> Result<StoreState, RecordError> {
    PersistedRecord::parse(raw).map(PersistedRecord::into_state)
}

/// Serialize the whole state as one structured record
pub fn encode_record(state: &StoreState) -> Result<String, serde_json::Error> {
    let g = &state.gamification;
    serde_json::to_string(&RecordRef {
        quizzes: &state.quizzes,
        xp: g.experience_points,
        level: g.level,
        streak: g.streak,
        last_completion_date: g.last_completion_date.as_deref(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIZ_A: &str = r#"{"id":"a","videoId":"dQw4w9WgXcQ","youtubeUrl":"https://youtu.be/dQw4w9WgXcQ","difficulty":"easy","numQuestions":1,"createdAt":1,"transcript":"t","quiz":[]}"#;

    #[test]
    fn test_decode_structured_partial() {
        let raw = format!(r#"{{"quizzes":[{}],"level":4}}"#, QUIZ_A);
        let state = decode_record(&raw).unwrap();
        assert_eq!(state.quizzes.len(), 1);
        assert_eq!(state.gamification.level, 4);
        assert_eq!(state.gamification.experience_points, 0);
        assert_eq!(state.gamification.streak, 0);
        assert_eq!(state.gamification.last_completion_date, None);
    }

    #[test]
    fn test_decode_structured_without_quizzes() {
        let state = decode_record(r#"{"xp":40,"streak":2,"lastCompletionDate":"Mon Oct 19 2026"}"#).unwrap();
        assert!(state.quizzes.is_empty());
        assert_eq!(state.gamification.experience_points, 40);
        assert_eq!(state.gamification.level, 1);
        assert_eq!(state.gamification.streak, 2);
        assert_eq!(
            state.gamification.last_completion_date.as_deref(),
            Some("Mon Oct 19 2026")
        );
    }

    #[test]
    fn test_decode_null_fields_take_defaults() {
        let state = decode_record(r#"{"quizzes":null,"xp":null,"level":null,"lastCompletionDate":null}"#).unwrap();
        assert_eq!(state, StoreState::default());
    }

    #[test]
    fn test_decode_normalizes_out_of_range() {
        let state = decode_record(r#"{"xp":230,"level":0}"#).unwrap();
        assert_eq!(state.gamification.experience_points, 30);
        assert_eq!(state.gamification.level, 3);
    }

    #[test]
    fn test_decode_legacy_array() {
        let state = decode_record(&format!("[{}]", QUIZ_A)).unwrap();
        assert_eq!(state.quizzes[0].id, "a");
        assert_eq!(state.gamification, GamificationState::default());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_record("{not json"), Err(RecordError::Syntax(_))));
        assert!(matches!(decode_record("null"), Err(RecordError::Shape("null"))));
        assert!(matches!(decode_record("42"), Err(RecordError::Shape(_))));
        assert!(matches!(decode_record(r#""text""#), Err(RecordError::Shape(_))));
    }

    #[test]
    fn test_decode_skips_bad_quiz_entries() {
        let state = decode_record(&format!(r#"[{{"id":"missing-fields"}},{},7]"#, QUIZ_A)).unwrap();
        assert_eq!(state.quizzes.len(), 1);
        assert_eq!(state.quizzes[0].id, "a");
    }

    #[test]
    fn test_decode_wrong_types_take_defaults() {
        let raw = format!(
            r#"{{"quizzes":[{}],"xp":"40","level":7,"streak":-2,"lastCompletionDate":5}}"#,
            QUIZ_A
        );
        let state = decode_record(&raw).unwrap();
        assert_eq!(state.quizzes.len(), 1);
        assert_eq!(state.gamification.experience_points, 0);
        assert_eq!(state.gamification.level, 7);
        assert_eq!(state.gamification.streak, 0);
        assert_eq!(state.gamification.last_completion_date, None);
    }

    #[test]
    fn test_decode_quizzes_not_a_list() {
        let state = decode_record(r#"{"quizzes":{"a":1},"level":2,"xp":12.0}"#).unwrap();
        assert!(state.quizzes.is_empty());
        assert_eq!(state.gamification.level, 2);
        assert_eq!(state.gamification.experience_points, 12);
    }

    #[test]
    fn test_decode_descriptive_xp_name() {
        let state = decode_record(r#"{"experiencePoints":55}"#).unwrap();
        assert_eq!(state.gamification.experience_points, 55);
    }

    #[test]
    fn test_encode_structured_shape() {
        let state = decode_record(&format!("[{}]", QUIZ_A)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encode_record(&state).unwrap()).unwrap();
        assert_eq!(value["xp"], 0);
        assert_eq!(value["level"], 1);
        assert_eq!(value["streak"], 0);
        assert!(value["lastCompletionDate"].is_null());
        assert_eq!(value["quizzes"][0]["id"], "a");
    }
}
