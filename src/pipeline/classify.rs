//! Document-type classification from recognized text.
//!
//! Pure keyword scan, case-insensitive, fixed priority:
//! OPD note > lab report > prescription, defaulting to general.
//! Absence of signal is a valid outcome, never an error.

use crate::models::DocumentType;

const OPD_KEYWORDS: &[&str] = &["opd", "out-patient", "outpatient", "chief complaint"];
const LAB_KEYWORDS: &[&str] = &["laboratory", "lab report", "test result", "pathologist"];
const PRESCRIPTION_KEYWORDS: &[&str] = &["prescription", "rx", "medicines prescribed"];

/// Infer the document category from its full recognized text.
pub fn classify_document_type(full_text: &str) -> DocumentType {
    let lower = full_text.to_lowercase();

    if OPD_KEYWORDS.iter().any(|k| lower.contains(k)) {
        DocumentType::OpdNote
    } else if LAB_KEYWORDS.iter().any(|k| lower.contains(k)) {
        DocumentType::LabReport
    } else if PRESCRIPTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        DocumentType::Prescription
    } else {
        DocumentType::General
    }
}
