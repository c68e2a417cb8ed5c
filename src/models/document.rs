//! Document input types and the recognition output they produce.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// Document type
// ═══════════════════════════════════════════

/// The four document categories the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    OpdNote,
    LabReport,
    Prescription,
    General,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpdNote => "opd_note",
            Self::LabReport => "lab_report",
            Self::Prescription => "prescription",
            Self::General => "general",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "opd_note" => Some(Self::OpdNote),
            "lab_report" => Some(Self::LabReport),
            "prescription" => Some(Self::Prescription),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    pub fn all() -> &'static [DocumentType] {
        &[
            Self::OpdNote,
            Self::LabReport,
            Self::Prescription,
            Self::General,
        ]
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Document
// ═══════════════════════════════════════════

/// A scanned document submitted for digitization.
///
/// Ephemeral: lives for one synchronous pipeline run, or inside its job
/// row until the job is purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Raw image payload (JPEG/PNG/TIFF).
    pub bytes: Vec<u8>,
    /// Caller-declared language hint (e.g. "en", "ml"). None means
    /// unspecified, which routes to the handwriting engine.
    pub language_hint: Option<String>,
    /// Caller-declared document type, if known up front.
    pub declared_type: Option<DocumentType>,
}

impl Document {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            language_hint: None,
            declared_type: None,
        }
    }

    pub fn with_language_hint(mut self, hint: &str) -> Self {
        self.language_hint = Some(hint.to_string());
        self
    }

    pub fn with_declared_type(mut self, document_type: DocumentType) -> Self {
        self.declared_type = Some(document_type);
        self
    }
}

// ═══════════════════════════════════════════
// Recognition output
// ═══════════════════════════════════════════

/// Bounding box for a recognized text block, normalized to a 1000x1000
/// grid. Emitted by the layout-aware engine only; used to separate
/// header fields from body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAnchor {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// A single recognized line of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedLine {
    pub text: String,
    pub confidence: f32,
    pub anchor: Option<TextAnchor>,
}

impl RecognizedLine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor: TextAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

/// Output of one recognition run. Produced once per document and
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedText {
    pub lines: Vec<RecognizedLine>,
    pub full_text: String,
    /// Identifier of the engine that produced this run.
    pub engine_id: String,
    /// Mean of per-line confidences; 0.0 when no lines were recognized.
    pub avg_confidence: f32,
    pub line_count: usize,
}

impl RecognizedText {
    /// Build from recognized lines; full text is the newline join and
    /// average confidence is derived from the lines.
    pub fn from_lines(engine_id: &str, lines: Vec<RecognizedLine>) -> Self {
        let full_text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let avg_confidence = if lines.is_empty() {
            0.0
        } else {
            lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32
        };
        let line_count = lines.len();
        Self {
            lines,
            full_text,
            engine_id: engine_id.to_string(),
            avg_confidence,
            line_count,
        }
    }
}
