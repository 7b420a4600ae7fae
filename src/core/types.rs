// src/core/types.rs
use serde::{Deserialize, Deserializer, Serialize};

/// Position of a record in the load order. Stable for the lifetime of the process.
pub type RecordIndex = usize;

/// Golden value of a record nobody has answered yet.
pub const UNANSWERED: &str = "";

/// Golden value meaning "none of the candidates is correct".
pub const NO_CORRECT_CANDIDATE: &str = "?";

/// Decodes an explicit `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One possible answer for a record's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Alternate display names, preferred name first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub names: Vec<String>,
    /// Distance (or similarity) of this candidate to the record's input.
    #[serde(default)]
    pub distance: f64,
}

/// An input to be annotated, its candidates, and optionally its golden answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Caller-supplied source identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub input: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub candidates: Vec<Candidate>,
    /// Id of the true answer, "" for not yet assessed, "?" for unknown.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub golden: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Restricted ("control access") records are listed first in term lookups.
    #[serde(
        rename = "controlaccess",
        alias = "restricted",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub restricted: bool,
}

impl Record {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn is_answered(&self) -> bool {
        self.golden != UNANSWERED
    }

    pub fn has_no_correct_candidate(&self) -> bool {
        self.golden == NO_CORRECT_CANDIDATE
    }

    /// Finds a candidate by its id.
    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }
}
