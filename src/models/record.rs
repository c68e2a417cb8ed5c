//! Extraction output types: the flat field record, the path that
//! produced it, and the confidence/disposition pair derived from it.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// Extraction path
// ═══════════════════════════════════════════

/// Which of the two extraction paths produced a record. Recorded with
/// every record because scoring selects its regime from it; the paths
/// are never merged field-by-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    /// Language-model extraction (open schema).
    Model,
    /// Deterministic regex/keyword extraction (fixed schema).
    Fallback,
}

impl ExtractionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "model" => Some(Self::Model),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExtractionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Extraction record
// ═══════════════════════════════════════════

/// Flat field-name → value mapping with an open schema.
///
/// Insertion order is extraction order and is preserved. Records are
/// never mutated after creation — a retry replaces the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionRecord {
    fields: Vec<(String, String)>,
}

impl ExtractionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value in place if the key exists.
    pub fn insert(&mut self, key: &str, value: String) {
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key.to_string(), value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ExtractionRecord {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(&k, v);
        }
        record
    }
}

// ═══════════════════════════════════════════
// Confidence & disposition
// ═══════════════════════════════════════════

/// Triage outcome assigned to an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    AutoApproved,
    PendingReview,
    Rejected,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoApproved => "AUTO_APPROVED",
            Self::PendingReview => "PENDING_REVIEW",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "AUTO_APPROVED" => Some(Self::AutoApproved),
            "PENDING_REVIEW" => Some(Self::PendingReview),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A confidence value in [0.0, 1.0] and the disposition it implies.
/// Derived deterministically from a record — never stored apart from
/// the record that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub value: f32,
    pub disposition: Disposition,
}
