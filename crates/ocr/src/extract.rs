use std::ops::Range;
use std::sync::OnceLock;

use docscan_core::{DocumentFields, FieldRuleSet};
use regex::Regex;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Two consecutive tokens of uppercase Latin/Latin-1 letters and apostrophes.
re!(re_full_name, r"([A-ZÀ-ÖØ-Þ']+\s+[A-ZÀ-ÖØ-Þ']+)");

// Label (French, English, or Arabic), then DD.MM.YYYY or DD/MM/YYYY. The
// date substring is the capture; no calendar validation, so 32.13.2099 matches.
re!(re_birth_date,
    r"(?:Née le|the|مزدادة بتاريخ)[:\s]*(\d{2}\.\d{2}\.\d{4}|\d{2}/\d{2}/\d{4})");

// Preposition à (or the Arabic ب), then an uppercase token.
re!(re_birth_place, r"(?:à|ب)\s+([A-ZÀ-ÖØ-Þ']+)");

re!(re_expiry_date,
    r"(?:Valable jusqu'au|صالحة إلى غاية)[:\s]*(\d{2}\.\d{2}\.\d{4}|\d{2}/\d{2}/\d{4})");

re!(re_digit_run, r"\d+");

// ── Public extraction API ─────────────────────────────────────────────────────

/// Applies the ordered pattern rules over normalized text. Rules are
/// first-match-wins and independent of each other, with one deliberate
/// exception: digit runs already captured by a date rule are not eligible
/// as the document number.
pub struct Extractor {
    rule_set: FieldRuleSet,
}

impl Extractor {
    pub fn new(rule_set: FieldRuleSet) -> Self {
        Self { rule_set }
    }

    pub fn extract(&self, text: &str) -> DocumentFields {
        let mut fields = DocumentFields::default();
        let mut date_spans: Vec<Range<usize>> = Vec::new();

        if let Some(m) = re_full_name().captures(text).and_then(|c| c.get(1)) {
            fields.full_name = Some(m.as_str().to_string());
        }

        if let Some(m) = re_birth_date().captures(text).and_then(|c| c.get(1)) {
            date_spans.push(m.range());
            fields.birth_date = Some(m.as_str().to_string());
        }

        if let Some(m) = re_birth_place().captures(text).and_then(|c| c.get(1)) {
            fields.birth_place = Some(m.as_str().to_string());
        }

        if self.rule_set == FieldRuleSet::Extended {
            if let Some(m) = re_expiry_date().captures(text).and_then(|c| c.get(1)) {
                date_spans.push(m.range());
                fields.expiry_date = Some(m.as_str().to_string());
            }
        }

        fields.document_number = extract_document_number(text, &date_spans);
        fields
    }
}

/// First maximal run of 4–10 digits that does not overlap a substring
/// already captured by a date rule. Runs of 11+ digits never qualify.
fn extract_document_number(text: &str, consumed: &[Range<usize>]) -> Option<String> {
    re_digit_run()
        .find_iter(text)
        .filter(|m| (4..=10).contains(&m.as_str().len()))
        .find(|m| !consumed.iter().any(|r| m.start() < r.end && r.start < m.end()))
        .map(|m| m.as_str().to_string())
}
