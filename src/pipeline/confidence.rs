//! Confidence scoring and triage.
//!
//! Two scoring regimes, one per extraction path. The model path is
//! scored by breadth (how many fields came back), the fallback path by
//! whether the fields its fixed schema marks as required for the
//! document type were hit. Disposition boundaries are inclusive at the
//! lower edge: a score of exactly 0.90 auto-approves, exactly 0.70
//! goes to review.

use crate::config::TriageThresholds;
use crate::models::{ConfidenceScore, Disposition, DocumentType, ExtractionPath, ExtractionRecord};

/// Share of the fallback score carried by the required field set.
const REQUIRED_SHARE: f32 = 0.70;
/// Share carried by the optional field set.
const OPTIONAL_SHARE: f32 = 0.20;

/// Fallback-schema fields per document type: (required, optional).
/// Field names match what the rule-based extractor emits.
fn fallback_field_sets(
    document_type: DocumentType,
) -> (&'static [&'static str], &'static [&'static str]) {
    match document_type {
        DocumentType::OpdNote => (&["patient_id", "diagnosis"], &["medications", "vitals"]),
        DocumentType::LabReport => (
            &["patient_id", "test_name", "results"],
            &["test_date", "remarks"],
        ),
        DocumentType::Prescription => (&["patient_id", "medications"], &[]),
        DocumentType::General => (&["patient_id"], &[]),
    }
}

/// Score an extraction record and assign its triage disposition.
pub fn score(
    record: &ExtractionRecord,
    document_type: DocumentType,
    path: ExtractionPath,
    thresholds: &TriageThresholds,
) -> ConfidenceScore {
    let value = match path {
        ExtractionPath::Model => model_score(record, thresholds),
        ExtractionPath::Fallback => fallback_score(record, document_type),
    };
    let disposition = disposition_for(value, thresholds);
    tracing::debug!(
        document_type = document_type.as_str(),
        path = path.as_str(),
        confidence = value,
        disposition = disposition.as_str(),
        "Scored extraction record"
    );
    ConfidenceScore { value, disposition }
}

/// Model-path scoring: a step function over field count. A model that
/// produced a rich record is trusted more than one that produced a
/// sparse one, independent of which fields those are.
fn model_score(record: &ExtractionRecord, thresholds: &TriageThresholds) -> f32 {
    let count = record.len();
    let bands = &thresholds.model_bands;
    if count >= bands.full {
        0.95
    } else if count >= bands.broad {
        0.85
    } else if count >= bands.partial {
        0.75
    } else if count >= bands.minimal {
        0.60
    } else {
        0.40
    }
}

/// Fallback-path scoring: the fraction of the type's required set
/// present carries most of the score, the optional set the rest.
/// Types whose schema defines no optional fields are not penalized
/// for the missing set.
fn fallback_score(record: &ExtractionRecord, document_type: DocumentType) -> f32 {
    let (required, optional) = fallback_field_sets(document_type);

    let present = |fields: &[&str]| {
        fields
            .iter()
            .filter(|f| record.get(f).is_some_and(|v| !v.is_empty()))
            .count() as f32
    };

    let required_fraction = present(required) / required.len() as f32;
    let optional_fraction = if optional.is_empty() {
        1.0
    } else {
        present(optional) / optional.len() as f32
    };

    (required_fraction * REQUIRED_SHARE + optional_fraction * OPTIONAL_SHARE).clamp(0.0, 1.0)
}

fn disposition_for(value: f32, thresholds: &TriageThresholds) -> Disposition {
    if value >= thresholds.auto_approve {
        Disposition::AutoApproved
    } else if value >= thresholds.review {
        Disposition::PendingReview
    } else {
        Disposition::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_of(pairs: &[(&str, &str)]) -> ExtractionRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn wide_record(count: usize) -> ExtractionRecord {
        (0..count)
            .map(|i| (format!("field_{i}"), "value".to_string()))
            .collect()
    }

    #[test]
    fn model_bands_step_with_field_count() {
        let t = TriageThresholds::default();
        for (count, expected) in [(15, 0.95), (10, 0.85), (6, 0.75), (3, 0.60), (2, 0.40)] {
            let s = score(
                &wide_record(count),
                DocumentType::OpdNote,
                ExtractionPath::Model,
                &t,
            );
            assert_eq!(s.value, expected, "count {count}");
        }
    }

    #[test]
    fn rich_model_record_auto_approves() {
        let t = TriageThresholds::default();
        let s = score(
            &wide_record(18),
            DocumentType::General,
            ExtractionPath::Model,
            &t,
        );
        assert_eq!(s.disposition, Disposition::AutoApproved);
    }

    #[test]
    fn sparse_model_record_rejected() {
        let t = TriageThresholds::default();
        let s = score(
            &wide_record(1),
            DocumentType::General,
            ExtractionPath::Model,
            &t,
        );
        assert_eq!(s.disposition, Disposition::Rejected);
    }

    #[test]
    fn fallback_full_opd_sits_on_approve_boundary() {
        let t = TriageThresholds::default();
        let record = record_of(&[
            ("patient_id", "MS-1"),
            ("diagnosis", "Dengue"),
            ("medications", "Paracetamol 500mg TDS"),
            ("vitals", "pulse: 80 bpm"),
        ]);
        let s = score(&record, DocumentType::OpdNote, ExtractionPath::Fallback, &t);
        assert!((s.value - 0.90).abs() < 1e-6);
        // Boundary is inclusive.
        assert_eq!(s.disposition, Disposition::AutoApproved);
    }

    #[test]
    fn fallback_required_plus_one_optional_goes_to_review() {
        let t = TriageThresholds::default();
        let record = record_of(&[
            ("patient_id", "MS-1"),
            ("diagnosis", "Dengue"),
            ("medications", "Paracetamol 500mg TDS"),
        ]);
        let s = score(&record, DocumentType::OpdNote, ExtractionPath::Fallback, &t);
        assert!((s.value - 0.80).abs() < 1e-6);
        assert_eq!(s.disposition, Disposition::PendingReview);
    }

    #[test]
    fn fallback_full_lab_report_auto_approves() {
        let t = TriageThresholds::default();
        let record = record_of(&[
            ("patient_id", "MS-2"),
            ("test_name", "Complete Blood Count"),
            ("test_date", "12-Aug-2026"),
            ("results", "Hemoglobin: 11.2 g/dL"),
            ("remarks", "Mild anaemia"),
        ]);
        let s = score(&record, DocumentType::LabReport, ExtractionPath::Fallback, &t);
        assert!((s.value - 0.90).abs() < 1e-6);
        assert_eq!(s.disposition, Disposition::AutoApproved);
    }

    #[test]
    fn fallback_lab_report_is_scored_on_its_own_schema() {
        let t = TriageThresholds::default();
        // No diagnosis field exists for lab reports; its absence must
        // not drag the score down.
        let record = record_of(&[
            ("patient_id", "MS-2"),
            ("test_name", "Widal"),
            ("results", "Titre: 1:160"),
        ]);
        let s = score(&record, DocumentType::LabReport, ExtractionPath::Fallback, &t);
        assert!((s.value - 0.70).abs() < 1e-6);
        assert_eq!(s.disposition, Disposition::PendingReview);
    }

    #[test]
    fn fallback_full_prescription_auto_approves() {
        let t = TriageThresholds::default();
        let record = record_of(&[
            ("patient_id", "RX-7"),
            ("medications", "Metformin 500mg BD; Amlodipine 5 mg OD"),
        ]);
        let s = score(
            &record,
            DocumentType::Prescription,
            ExtractionPath::Fallback,
            &t,
        );
        assert!((s.value - 0.90).abs() < 1e-6);
        assert_eq!(s.disposition, Disposition::AutoApproved);
    }

    #[test]
    fn fallback_general_scores_on_identifier_alone() {
        let t = TriageThresholds::default();
        let record = record_of(&[("patient_id", "G-1"), ("raw_text", "handwritten note")]);
        let s = score(&record, DocumentType::General, ExtractionPath::Fallback, &t);
        assert!((s.value - 0.90).abs() < 1e-6);

        let without = record_of(&[("raw_text", "handwritten note")]);
        let s = score(&without, DocumentType::General, ExtractionPath::Fallback, &t);
        assert_eq!(s.disposition, Disposition::Rejected);
    }

    #[test]
    fn fallback_missing_required_rejected() {
        let t = TriageThresholds::default();
        let record = record_of(&[("diagnosis", "Dengue"), ("vitals", "pulse: 80 bpm")]);
        let s = score(&record, DocumentType::OpdNote, ExtractionPath::Fallback, &t);
        assert!((s.value - 0.45).abs() < 1e-6);
        assert_eq!(s.disposition, Disposition::Rejected);
    }

    #[test]
    fn fallback_empty_record_scores_zero_for_opd() {
        let t = TriageThresholds::default();
        let s = score(
            &ExtractionRecord::new(),
            DocumentType::OpdNote,
            ExtractionPath::Fallback,
            &t,
        );
        assert_eq!(s.value, 0.0);
        assert_eq!(s.disposition, Disposition::Rejected);
    }

    #[test]
    fn review_boundary_is_inclusive() {
        let t = TriageThresholds::default();
        // Both required fields, no optional: 0.70 exactly.
        let record = record_of(&[("patient_id", "MS-1"), ("diagnosis", "Dengue")]);
        let s = score(&record, DocumentType::OpdNote, ExtractionPath::Fallback, &t);
        assert!((s.value - 0.70).abs() < 1e-6);
        assert_eq!(s.disposition, Disposition::PendingReview);
    }

    #[test]
    fn disposition_boundaries_are_exact() {
        let t = TriageThresholds::default();
        assert_eq!(disposition_for(0.90, &t), Disposition::AutoApproved);
        assert_eq!(disposition_for(0.8999, &t), Disposition::PendingReview);
        assert_eq!(disposition_for(0.70, &t), Disposition::PendingReview);
        assert_eq!(disposition_for(0.6999, &t), Disposition::Rejected);
    }

    #[test]
    fn scoring_is_deterministic() {
        let t = TriageThresholds::default();
        let record = record_of(&[("patient_id", "MS-1"), ("diagnosis", "Dengue")]);
        let first = score(&record, DocumentType::OpdNote, ExtractionPath::Fallback, &t);
        let second = score(&record, DocumentType::OpdNote, ExtractionPath::Fallback, &t);
        assert_eq!(first, second);
    }

    #[test]
    fn blank_field_values_do_not_count() {
        let t = TriageThresholds::default();
        let record = record_of(&[("patient_id", ""), ("diagnosis", "Dengue")]);
        let s = score(&record, DocumentType::OpdNote, ExtractionPath::Fallback, &t);
        assert!((s.value - 0.35).abs() < 1e-6);
    }
}
