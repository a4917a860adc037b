//! Class labels and the ordinal label codec

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Number of classes every classifier distinguishes
pub const CLASS_COUNT: usize = 2;

/// Biological sex as estimated from the mandible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub const ALL: [Sex; CLASS_COUNT] = [Sex::Female, Sex::Male];

    /// Short label code stored in datasets and artifacts
    pub fn code(self) -> &'static str {
        match self {
            Sex::Female => "F",
            Sex::Male => "M",
        }
    }

    /// Display form
    pub fn full_name(self) -> &'static str {
        match self {
            Sex::Female => "Female",
            Sex::Male => "Male",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ClassifierError> {
        match code {
            "F" => Ok(Sex::Female),
            "M" => Ok(Sex::Male),
            other => Err(ClassifierError::UnknownLabel(other.to_string())),
        }
    }

    /// Lenient parser for dataset cells: accepts codes and full names in any case
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "f" | "female" => Some(Sex::Female),
            "m" | "male" => Some(Sex::Male),
            _ => None,
        }
    }
}

/// Fitted state: distinct labels in ascending lexical order, index = ordinal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecState {
    pub classes: Vec<String>,
}

/// Bidirectional mapping between label strings and ordinal indices
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    state: Option<CodecState>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: CodecState) -> Self {
        Self { state: Some(state) }
    }

    /// Fit on the full label set. Ordinals follow sorted order of the distinct labels.
    pub fn fit<S: AsRef<str>>(&mut self, labels: &[S]) -> &CodecState {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        self.state.insert(CodecState { classes })
    }

    pub fn state(&self) -> Result<&CodecState, ClassifierError> {
        self.state.as_ref().ok_or(ClassifierError::NotFitted("LabelEncoder"))
    }

    pub fn encode(&self, label: &str) -> Result<usize, ClassifierError> {
        self.state()?
            .classes
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| ClassifierError::UnknownLabel(label.to_string()))
    }

    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, ClassifierError> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    pub fn decode(&self, index: usize) -> Result<&str, ClassifierError> {
        self.state()?
            .classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ClassifierError::UnknownLabel(format!("ordinal {}", index)))
    }
}
