//! Prompt construction for the language-model extraction path.

use crate::models::DocumentType;

/// System prompt fixing the output contract: a single flat JSON object
/// whose values are all strings. The flat shape is what lets the parser
/// stay lenient and the record stay order-preserving.
pub fn system_prompt() -> &'static str {
    "You are a medical document extraction assistant. Extract every \
     clinically relevant field from the document text you are given.\n\
     Respond with a single flat JSON object. Every value must be a \
     string; join multiple values for one field with '; '. Do not nest \
     objects or arrays, do not invent fields that are not present in \
     the text, and do not include commentary outside the JSON object."
}

/// Per-document-type guidance appended to the user prompt.
fn type_guidance(document_type: DocumentType) -> &'static str {
    match document_type {
        DocumentType::OpdNote => {
            "This is an out-patient department note. Look for: patient_id \
             (UHID), patient name, age, sex, chief complaint, diagnosis, \
             vitals (BP, pulse, temperature, weight), medications with \
             dose and frequency, and follow-up advice."
        }
        DocumentType::LabReport => {
            "This is a laboratory report. Look for: patient_id (UHID), \
             patient name, test_name, test_date, individual test results \
             with values and reference ranges, and pathologist remarks."
        }
        DocumentType::Prescription => {
            "This is a prescription. Look for: patient_id (UHID), patient \
             name, prescribing doctor, date, and each medication with its \
             dose, frequency and duration."
        }
        DocumentType::General => {
            "Document type is unknown. Extract any identifiers, dates, \
             diagnoses, medications or findings you can locate."
        }
    }
}

/// Build the user prompt for one document.
pub fn extraction_prompt(full_text: &str, document_type: DocumentType) -> String {
    format!(
        "{}\n\nDOCUMENT TEXT:\n{}",
        type_guidance(document_type),
        full_text
    )
}
