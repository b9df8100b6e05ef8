use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Label {
    Safe,
    Malicious,
}

impl Label {
    pub fn is_malicious(self) -> bool {
        self == Label::Malicious
    }
}

impl TryFrom<i64> for Label {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Label::Safe),
            1 => Ok(Label::Malicious),
            other => Err(Error::Data(format!("label must be 0 or 1, got {other}"))),
        }
    }
}

impl From<Label> for i64 {
    fn from(label: Label) -> Self {
        match label {
            Label::Safe => 0,
            Label::Malicious => 1,
        }
    }
}

/// One row of the labeled training set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub label: Label,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// A labeled example together with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub label: Label,
    pub embedding: Vec<f32>,
}
