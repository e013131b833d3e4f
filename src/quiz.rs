//! Quiz records and YouTube link helpers
//!
//! Field names on the wire match the records the web app already keeps in
//! LocalStorage; the descriptive names are accepted as aliases when reading.

use chrono::{DateTime, Datelike};
use serde::{Deserialize, Serialize};

use crate::consts::{TRANSCRIPT_EXPANDED_CHARS, TRANSCRIPT_PREVIEW_CHARS};

/// Question difficulty requested from the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Like [`Difficulty::from_str`], with a message fit to show the user
    pub fn parse(s: &str) -> Result<Self, String> {
        Self::from_str(s).ok_or_else(|| {
            format!("unknown difficulty '{}' (expected easy, medium or hard)", s.trim())
        })
    }
}

/// One multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(rename = "question", alias = "promptText")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(rename = "correct_answer", alias = "correctOption")]
    pub correct_option: String,
    #[serde(default)]
    pub explanation: String,
}

impl QuizQuestion {
    /// Whether option `index` is the correct one (whitespace-insensitive at the ends)
    pub fn is_correct(&self, index: usize) -> bool {
        self.options
            .get(index)
            .is_some_and(|option| option.trim() == self.correct_option.trim())
    }

    /// Index of the correct option, if it is among the options at all
    pub fn correct_index(&self) -> Option<usize> {
        (0..self.options.len()).find(|&i| self.is_correct(i))
    }
}

/// A generated quiz kept in the local library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredQuiz {
    pub id: String,
    pub video_id: String,
    #[serde(rename = "youtubeUrl", alias = "sourceUrl")]
    pub source_url: String,
    pub difficulty: Difficulty,
    #[serde(rename = "numQuestions", alias = "requestedQuestionCount")]
    pub requested_question_count: u32,
    /// Unix timestamp (ms) when generated
    pub created_at: i64,
    pub transcript: String,
    #[serde(rename = "quiz", alias = "questions")]
    pub questions: Vec<QuizQuestion>,
    /// Latest score from the player (correct answers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl StoredQuiz {
    /// Build the record for a freshly generated quiz.
    ///
    /// The id is `<video_id>-<created_at>`, unique per generation.
    pub fn from_generated(
        video_id: &str,
        source_url: &str,
        difficulty: Difficulty,
        requested_question_count: u32,
        created_at: i64,
        transcript: String,
        questions: Vec<QuizQuestion>,
    ) -> Self {
        Self {
            id: format!("{}-{}", video_id, created_at),
            video_id: video_id.to_string(),
            source_url: source_url.to_string(),
            difficulty,
            requested_question_count,
            created_at,
            transcript,
            questions,
            score: None,
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn thumbnail_url(&self) -> String {
        thumbnail_url(&self.video_id)
    }

    /// Leading part of the transcript: 320 characters collapsed, 2000 expanded
    pub fn transcript_preview(&self, expanded: bool) -> &str {
        let limit = if expanded {
            TRANSCRIPT_EXPANDED_CHARS
        } else {
            TRANSCRIPT_PREVIEW_CHARS
        };
        truncate_chars(&self.transcript, limit)
    }

    /// Whether the collapsed preview cuts the transcript short
    pub fn transcript_truncated(&self, expanded: bool) -> bool {
        self.transcript_preview(expanded).len() < self.transcript.len()
    }

    /// The preview split into runs matching `query` and the text between them
    pub fn transcript_segments(&self, expanded: bool, query: &str) -> Vec<TranscriptSegment> {
        transcript_segments(self.transcript_preview(expanded), query)
    }
}

/// A run of transcript text, highlighted when it matched the search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub matched: bool,
}

impl TranscriptSegment {
    fn new(text: &str, matched: bool) -> Self {
        Self {
            text: text.to_string(),
            matched,
        }
    }
}

/// First `limit` characters of `text`
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Byte length of the case-insensitive match of `needle` at the start of `haystack`
fn match_len(haystack: &str, needle: &[char]) -> Option<usize> {
    let mut chars = haystack.char_indices();
    for &n in needle {
        let (_, c) = chars.next()?;
        if !c.to_lowercase().eq(n.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map_or(haystack.len(), |(end, _)| end))
}

/// Split `text` into alternating unmatched and matched runs.
///
/// Matching ignores case and never overlaps; the runs concatenate back to
/// `text`. An empty query gives the whole text as one unmatched run, an empty
/// text gives no runs.
pub fn transcript_segments(text: &str, query: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    if text.is_empty() {
        return segments;
    }
    let needle: Vec<char> = query.chars().collect();
    if needle.is_empty() {
        segments.push(TranscriptSegment::new(text, false));
        return segments;
    }

    let mut plain_start = 0;
    let mut pos = 0;
    while let Some(c) = text[pos..].chars().next() {
        match match_len(&text[pos..], &needle) {
            Some(len) => {
                if plain_start < pos {
                    segments.push(TranscriptSegment::new(&text[plain_start..pos], false));
                }
                segments.push(TranscriptSegment::new(&text[pos..pos + len], true));
                pos += len;
                plain_start = pos;
            }
            None => pos += c.len_utf8(),
        }
    }
    if plain_start < text.len() {
        segments.push(TranscriptSegment::new(&text[plain_start..], false));
    }
    segments
}

/// Length of a YouTube video id
const VIDEO_ID_LEN: usize = 11;

fn is_video_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Extract the 11-character video id from a YouTube link.
///
/// Takes the leftmost id-shaped run directly after `v=` or `/`, which covers
/// `watch?v=`, `youtu.be/`, `/embed/` and `/shorts/` links.
pub fn extract_video_id(url: &str) -> Option<&str> {
    let bytes = url.as_bytes();
    let id_at = |start: usize| -> Option<&str> {
        let end = start + VIDEO_ID_LEN;
        if end <= bytes.len() && bytes[start..end].iter().all(|&b| is_video_id_byte(b)) {
            // All bytes are ASCII, so these are char boundaries
            Some(&url[start..end])
        } else {
            None
        }
    };

    for i in 0..bytes.len() {
        if bytes[i..].starts_with(b"v=") {
            if let Some(id) = id_at(i + 2) {
                return Some(id);
            }
        }
        if bytes[i] == b'/' {
            if let Some(id) = id_at(i + 1) {
                return Some(id);
            }
        }
    }
    None
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id)
}

/// Format a creation timestamp relative to `now_ms` ("Just now", "3 days ago", "10/4/26")
pub fn format_created_at(created_at_ms: i64, now_ms: i64) -> String {
    let diff_mins = (now_ms - created_at_ms).max(0) / 60_000;
    let diff_hours = diff_mins / 60;
    let diff_days = diff_hours / 24;

    if diff_days >= 1 {
        if diff_days == 1 {
            "Yesterday".to_string()
        } else if diff_days < 7 {
            format!("{} days ago", diff_days)
        } else {
            match DateTime::from_timestamp_millis(created_at_ms) {
                Some(date) => format!("{}/{}/{}", date.month(), date.day(), date.year() % 100),
                None => "Unknown date".to_string(),
            }
        }
    } else if diff_hours >= 1 {
        if diff_hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", diff_hours)
        }
    } else if diff_mins >= 1 {
        if diff_mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{} mins ago", diff_mins)
        }
    } else {
        "Just now".to_string()
    }
}
