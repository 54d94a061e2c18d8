use serde::{Deserialize, Serialize};

/// Structured fields pulled out of one document's OCR text.
///
/// Every field is optional: `None` means the corresponding pattern did not
/// match. There is no distinction between "not present on the document" and
/// "extraction missed it". Absent fields are skipped during serialization so
/// the wire shape stays a sparse mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
}

impl DocumentFields {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.birth_date.is_none()
            && self.birth_place.is_none()
            && self.document_number.is_none()
            && self.expiry_date.is_none()
    }
}

/// Which extraction rules run. `Standard` covers the four fields of the
/// original card layout; `Extended` adds the expiry-date rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRuleSet {
    #[default]
    Standard,
    Extended,
}

impl std::fmt::Display for FieldRuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRuleSet::Standard => write!(f, "standard"),
            FieldRuleSet::Extended => write!(f, "extended"),
        }
    }
}

impl std::str::FromStr for FieldRuleSet {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(FieldRuleSet::Standard),
            "extended" => Ok(FieldRuleSet::Extended),
            other => Err(format!("Unknown rule set: '{other}'")),
        }
    }
}
