use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identity the recognition service reports for an unmatched face
pub const STRANGER_IDENTITY: &str = "Stranger";

/// Default status shown when a cycle finds nobody and the service gave no message
pub const NO_FACE_DETECTED: &str = "no face detected";

/// A person recognized in a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPerson {
    /// Matched identity, or `"Stranger"` when unmatched
    pub identity: String,
    /// Person state ordinal; nonzero marks the person as flagged
    #[serde(default, deserialize_with = "lenient_person_state")]
    pub person_state: i64,
    /// Any other attributes the service returned (confidence, box, ...)
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl RecognizedPerson {
    pub fn new<S: Into<String>>(identity: S, person_state: i64) -> Self {
        Self {
            identity: identity.into(),
            person_state,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn is_stranger(&self) -> bool {
        self.identity == STRANGER_IDENTITY
    }

    pub fn is_flagged(&self) -> bool {
        self.person_state != 0
    }

    /// Display label for this person
    pub fn label(&self) -> PersonLabel {
        PersonLabel::of(self)
    }
}

/// Read a person state ordinal, treating null or non-numeric values as 0
fn lenient_person_state<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let state = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        serde_json::Value::Bool(flagged) => i64::from(flagged),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(state)
}

/// Display classification derived from a recognized person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonLabel {
    Unknown,
    Flagged,
    Known,
}

impl PersonLabel {
    /// Derive the label of a person. Strangers are never flagged.
    pub fn of(person: &RecognizedPerson) -> Self {
        if person.is_stranger() {
            PersonLabel::Unknown
        } else if person.is_flagged() {
            PersonLabel::Flagged
        } else {
            PersonLabel::Known
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonLabel::Unknown => "unknown person",
            PersonLabel::Flagged => "flagged person",
            PersonLabel::Known => "known person",
        }
    }
}

impl fmt::Display for PersonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one recognition cycle
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    /// At least one person was recognized, in service order
    Persons(Vec<RecognizedPerson>),
    /// Nobody was recognized; the service may explain why
    Empty { message: Option<String> },
}

impl RecognitionOutcome {
    pub fn persons(&self) -> &[RecognizedPerson] {
        match self {
            RecognitionOutcome::Persons(persons) => persons,
            RecognitionOutcome::Empty { .. } => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RecognitionOutcome::Empty { .. })
    }

    /// Status to show for an empty outcome
    pub fn status_message(&self) -> Option<&str> {
        match self {
            RecognitionOutcome::Persons(_) => None,
            RecognitionOutcome::Empty { message } => Some(
                message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(NO_FACE_DETECTED),
            ),
        }
    }
}

/// Wire shape of the recognition endpoint's response body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub persons: Option<Vec<RecognizedPerson>>,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<RecognitionResponse> for RecognitionOutcome {
    fn from(response: RecognitionResponse) -> Self {
        match response.persons {
            Some(persons) if !persons.is_empty() => RecognitionOutcome::Persons(persons),
            _ => RecognitionOutcome::Empty {
                message: response.message,
            },
        }
    }
}
