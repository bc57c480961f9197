use crate::error::CoreError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Post,
    Comment,
}

/// A single piece of timestamped text gathered from Reddit.
///
/// The text is guaranteed to be non-blank; construction fails otherwise,
/// including when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ItemFields")]
pub struct Item {
    text: String,
    created_at: DateTime<Utc>,
    source_kind: SourceKind,
}

#[derive(Deserialize)]
struct ItemFields {
    text: String,
    created_at: DateTime<Utc>,
    source_kind: SourceKind,
}

impl TryFrom<ItemFields> for Item {
    type Error = CoreError;

    fn try_from(fields: ItemFields) -> Result<Self, Self::Error> {
        Item::new(fields.text, fields.created_at, fields.source_kind)
    }
}

impl Item {
    pub fn new(
        text: impl Into<String>,
        created_at: DateTime<Utc>,
        source_kind: SourceKind,
    ) -> Result<Self, CoreError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CoreError::invalid_input("item text must not be empty"));
        }

        Ok(Self {
            text,
            created_at,
            source_kind,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
    Other(String),
}

impl SentimentLabel {
    /// Maps a raw model label onto the known sentiment classes, case-insensitively.
    pub fn from_model_label(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "negative" | "neg" => SentimentLabel::Negative,
            "neutral" | "neu" => SentimentLabel::Neutral,
            "positive" | "pos" => SentimentLabel::Positive,
            _ => SentimentLabel::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Negative => write!(f, "Negative"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
            SentimentLabel::Positive => write!(f, "Positive"),
            SentimentLabel::Other(label) => write!(f, "{}", label),
        }
    }
}

impl From<String> for SentimentLabel {
    fn from(raw: String) -> Self {
        SentimentLabel::from_model_label(&raw)
    }
}

impl From<SentimentLabel> for String {
    fn from(label: SentimentLabel) -> Self {
        label.to_string()
    }
}

/// One classifier verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub confidence: f32,
}

impl Sentiment {
    /// Confidence is clamped into `[0, 1]`; NaN becomes 0.
    pub fn new(label: SentimentLabel, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { label, confidence }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    #[serde(flatten)]
    pub item: Item,
    pub label: SentimentLabel,
    pub confidence: f32,
}

impl ClassifiedItem {
    pub fn new(item: Item, sentiment: Sentiment) -> Self {
        Self {
            item,
            label: sentiment.label,
            confidence: sentiment.confidence,
        }
    }
}

/// Parameters for one collection run.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub term: String,
    pub subreddit: String,
    pub result_limit: u32,
    pub window: Duration,
}

impl Query {
    pub fn new(
        term: impl Into<String>,
        subreddit: impl Into<String>,
        result_limit: u32,
        window: Duration,
    ) -> Result<Self, CoreError> {
        let term = term.into();
        let subreddit = subreddit.into();

        if term.trim().is_empty() {
            return Err(CoreError::invalid_input("search term must not be empty"));
        }
        if subreddit.trim().is_empty() {
            return Err(CoreError::invalid_input("subreddit must not be empty"));
        }
        if result_limit == 0 {
            return Err(CoreError::invalid_input("result limit must be positive"));
        }
        if window <= Duration::zero() {
            return Err(CoreError::invalid_input("time window must be positive"));
        }

        Ok(Self {
            term,
            subreddit,
            result_limit,
            window,
        })
    }
}
