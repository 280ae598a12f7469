use std::fmt;

use serde::{Deserialize, Serialize};

// ── Records ──────────────────────────────────────────────────────────────

/// Stable identifier of an input row. Taken from the `case_id` column when the
/// input has one, otherwise the zero-based data-row index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn from_index(index: usize) -> Self {
        Self(index.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One case as loaded from the input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub id: RecordId,
    pub title: String,
    pub body: String,
    /// Known outcome category. Empty when the row has no label.
    pub outcome_label: String,
    /// `title + " " + body`, computed once at construction.
    #[serde(skip)]
    combined_text: String,
}

impl CaseRecord {
    pub fn new(
        id: RecordId,
        title: impl Into<String>,
        body: impl Into<String>,
        outcome_label: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let body = body.into();
        let combined_text = format!("{title} {body}");
        Self {
            id,
            title,
            body,
            outcome_label: outcome_label.into(),
            combined_text,
        }
    }

    pub fn combined_text(&self) -> &str {
        &self.combined_text
    }

    pub fn has_label(&self) -> bool {
        !self.outcome_label.trim().is_empty()
    }
}

// ── Pipeline artifacts ───────────────────────────────────────────────────

/// Lemmatized token sequence for a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub record_id: RecordId,
    pub tokens: Vec<String>,
}

/// Term-count encoding of a document over a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(pub Vec<u32>);

impl FeatureVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }

    pub fn counts(&self) -> &[u32] {
        &self.0
    }
}

/// A vectorized record, still paired with its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRow {
    pub record_id: RecordId,
    pub vector: FeatureVector,
}

/// Predicted outcome for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub record_id: RecordId,
    pub label: String,
}
