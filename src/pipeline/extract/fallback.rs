//! Deterministic rule-based extraction.
//!
//! Runs when the language-model path is disabled or fails. Patterns
//! are tuned per document type and target the conventional layout of
//! Indian hospital paperwork (UHID identifiers, SECTION: headings,
//! "Drug 500mg - BD" medication lines). Total: always produces a
//! record, possibly an empty one.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{DocumentType, ExtractionRecord};

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

static UHID: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)UHID[:\s]+([A-Z0-9\-]+)"));
static DIAGNOSIS: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?is)DIAGNOSIS[:\s]+(.*?)(?:\n[A-Z]+:|\z)"));
static CHIEF_COMPLAINT: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?is)CHIEF COMPLAINT[:\s]+(.*?)(?:\n[A-Z]+:|\z)"));
static BLOOD_PRESSURE: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?i)Blood Pressure[:\s]+(\d+/\d+)"));
static PULSE: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)Pulse[:\s]+(\d+)"));
static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)Temperature[:\s]+([\d.]+)"));
static WEIGHT: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)Weight[:\s]+([\d.]+)"));
static MED_SECTION: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?is)MEDICATIONS[:\s]+(.*?)(?:\nADVICE|\n[A-Z]+:|\z)"));
static MED_LINE: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?i)(?:\d+\.\s*)?([A-Za-z]+)\s+(\d+\s*mg)\s*-\s*([A-Z]+)"));
static TEST_NAME: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)TEST[:\s]+(.*)"));
static TEST_DATE: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?i)Report Date[:\s]+([\d\-A-Za-z]+)"));
static LAB_RESULT: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?m)^\s*([A-Za-z][A-Za-z ]*):\s*([\d.]+)\s*([a-zA-Z/%]+)"));
static REMARKS: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?is)REMARKS[:\s]+(.*?)(?:\n[A-Z]+:|Lab Technician|\z)"));

/// Maximum raw-text excerpt carried for documents of unknown type.
const RAW_EXCERPT_CHARS: usize = 500;

/// Extract a flat record from raw text using type-specific patterns.
pub fn extract_fallback(full_text: &str, document_type: DocumentType) -> ExtractionRecord {
    let record = match document_type {
        DocumentType::OpdNote => extract_opd_note(full_text),
        DocumentType::LabReport => extract_lab_report(full_text),
        DocumentType::Prescription => extract_prescription(full_text),
        DocumentType::General => extract_general(full_text),
    };
    tracing::debug!(
        document_type = document_type.as_str(),
        fields = record.len(),
        "Rule-based extraction complete"
    );
    record
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn insert_if_found(record: &mut ExtractionRecord, key: &str, re: &Regex, text: &str) {
    if let Some(value) = capture(re, text) {
        record.insert(key, value.to_string());
    }
}

fn extract_opd_note(text: &str) -> ExtractionRecord {
    let mut record = ExtractionRecord::new();
    insert_if_found(&mut record, "patient_id", &UHID, text);
    insert_if_found(&mut record, "chief_complaint", &CHIEF_COMPLAINT, text);
    insert_if_found(&mut record, "diagnosis", &DIAGNOSIS, text);
    insert_if_found(&mut record, "blood_pressure", &BLOOD_PRESSURE, text);

    let mut vitals = Vec::new();
    if let Some(pulse) = capture(&PULSE, text) {
        vitals.push(format!("pulse: {pulse} bpm"));
    }
    if let Some(temp) = capture(&TEMPERATURE, text) {
        vitals.push(format!("temperature: {temp}°F"));
    }
    if let Some(weight) = capture(&WEIGHT, text) {
        vitals.push(format!("weight: {weight} kg"));
    }
    if !vitals.is_empty() {
        record.insert("vitals", vitals.join("; "));
    }

    if let Some(section) = capture(&MED_SECTION, text) {
        let meds = medication_lines(section);
        if !meds.is_empty() {
            record.insert("medications", meds.join("; "));
        }
    }
    record
}

fn extract_lab_report(text: &str) -> ExtractionRecord {
    let mut record = ExtractionRecord::new();
    insert_if_found(&mut record, "patient_id", &UHID, text);
    insert_if_found(&mut record, "test_name", &TEST_NAME, text);
    insert_if_found(&mut record, "test_date", &TEST_DATE, text);

    let mut results = Vec::new();
    for caps in LAB_RESULT.captures_iter(text) {
        let key = caps[1].trim();
        if key.is_empty() {
            continue;
        }
        results.push(format!("{key}: {} {}", &caps[2], &caps[3]));
    }
    if !results.is_empty() {
        record.insert("results", results.join("; "));
    }

    insert_if_found(&mut record, "remarks", &REMARKS, text);
    record
}

fn extract_prescription(text: &str) -> ExtractionRecord {
    let mut record = ExtractionRecord::new();
    insert_if_found(&mut record, "patient_id", &UHID, text);
    let meds = medication_lines(text);
    if !meds.is_empty() {
        record.insert("medications", meds.join("; "));
    }
    record
}

fn extract_general(text: &str) -> ExtractionRecord {
    let mut record = ExtractionRecord::new();
    insert_if_found(&mut record, "patient_id", &UHID, text);
    let excerpt: String = text.chars().take(RAW_EXCERPT_CHARS).collect();
    let excerpt = excerpt.trim();
    if !excerpt.is_empty() {
        record.insert("raw_text", excerpt.to_string());
    }
    record
}

/// Parse "1. Metformin 500mg - BD (After meals)" style lines into
/// "Metformin 500mg BD" entries, one per matching line.
fn medication_lines(section: &str) -> Vec<String> {
    section
        .lines()
        .filter_map(|line| {
            MED_LINE.captures(line).map(|caps| {
                format!("{} {} {}", &caps[1], caps[2].trim(), &caps[3])
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPD_NOTE: &str = "CITY HOSPITAL - OPD\n\
        UHID: MS-2024-001\n\
        CHIEF COMPLAINT: Fever and headache for 3 days\n\
        DIAGNOSIS: Typhoid Fever\n\
        VITALS:\n\
        Blood Pressure: 120/80\n\
        Pulse: 88\n\
        Temperature: 101.2\n\
        Weight: 64.5\n\
        MEDICATIONS:\n\
        1. Paracetamol 500mg - TDS (After meals)\n\
        2. Cefixime 200mg - BD\n\
        ADVICE: Review after 5 days";

    const LAB_REPORT: &str = "TEST: Complete Blood Count\n\
        UHID: MS-2024-002\n\
        Report Date: 12-Aug-2026\n\
        Hemoglobin: 11.2 g/dL\n\
        Platelets: 1.4 lakh/uL\n\
        REMARKS: Mild anaemia, suggest iron studies\n\
        Lab Technician: signed";

    #[test]
    fn opd_note_core_fields() {
        let record = extract_fallback(OPD_NOTE, DocumentType::OpdNote);
        assert_eq!(record.get("patient_id"), Some("MS-2024-001"));
        assert_eq!(record.get("diagnosis"), Some("Typhoid Fever"));
        assert_eq!(
            record.get("chief_complaint"),
            Some("Fever and headache for 3 days")
        );
        assert_eq!(record.get("blood_pressure"), Some("120/80"));
    }

    #[test]
    fn opd_note_vitals_folded() {
        let record = extract_fallback(OPD_NOTE, DocumentType::OpdNote);
        let vitals = record.get("vitals").unwrap();
        assert!(vitals.contains("pulse: 88 bpm"));
        assert!(vitals.contains("temperature: 101.2°F"));
        assert!(vitals.contains("weight: 64.5 kg"));
    }

    #[test]
    fn opd_note_medications_stop_at_advice() {
        let record = extract_fallback(OPD_NOTE, DocumentType::OpdNote);
        let meds = record.get("medications").unwrap();
        assert!(meds.contains("Paracetamol 500mg TDS"));
        assert!(meds.contains("Cefixime 200mg BD"));
        assert!(!meds.contains("Review"));
    }

    #[test]
    fn lab_report_fields() {
        let record = extract_fallback(LAB_REPORT, DocumentType::LabReport);
        assert_eq!(record.get("patient_id"), Some("MS-2024-002"));
        assert_eq!(record.get("test_name"), Some("Complete Blood Count"));
        assert_eq!(record.get("test_date"), Some("12-Aug-2026"));
        let results = record.get("results").unwrap();
        assert!(results.contains("Hemoglobin: 11.2 g/dL"));
    }

    #[test]
    fn lab_remarks_stop_at_technician_line() {
        let record = extract_fallback(LAB_REPORT, DocumentType::LabReport);
        let remarks = record.get("remarks").unwrap();
        assert!(remarks.contains("Mild anaemia"));
        assert!(!remarks.contains("signed"));
    }

    #[test]
    fn prescription_scans_all_lines() {
        let text = "UHID: RX-7\nTab Metformin 500mg - BD\nAmlodipine 5 mg - OD";
        let record = extract_fallback(text, DocumentType::Prescription);
        assert_eq!(record.get("patient_id"), Some("RX-7"));
        let meds = record.get("medications").unwrap();
        assert!(meds.contains("Metformin 500mg BD"));
        assert!(meds.contains("Amlodipine 5 mg OD"));
    }

    #[test]
    fn general_keeps_bounded_excerpt() {
        let long_text = format!("UHID: G-1\n{}", "x".repeat(2000));
        let record = extract_fallback(&long_text, DocumentType::General);
        assert_eq!(record.get("patient_id"), Some("G-1"));
        assert!(record.get("raw_text").unwrap().len() <= RAW_EXCERPT_CHARS);
    }

    #[test]
    fn missing_identifier_is_omitted_not_invented() {
        let record = extract_fallback("DIAGNOSIS: Migraine", DocumentType::OpdNote);
        assert!(record.get("patient_id").is_none());
        assert_eq!(record.get("diagnosis"), Some("Migraine"));
    }

    #[test]
    fn empty_text_yields_empty_record() {
        let record = extract_fallback("", DocumentType::OpdNote);
        assert!(record.is_empty());
    }
}
