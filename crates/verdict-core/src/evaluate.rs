//! Accuracy against known outcome labels.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::types::{CaseRecord, Prediction, RecordId};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelStats {
    /// Records whose true label is this one.
    pub support: usize,
    /// Records predicted as this label.
    pub predicted: usize,
    pub correct: usize,
}

impl LabelStats {
    pub fn precision(&self) -> f64 {
        ratio(self.correct, self.predicted)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.correct, self.support)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub evaluated: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub per_label: BTreeMap<String, LabelStats>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Score predictions against the records' labels, joined by record id.
/// Unlabelled records and predictions with no matching record are skipped.
/// `None` when nothing could be scored.
pub fn evaluate(records: &[CaseRecord], predictions: &[Prediction]) -> Option<Evaluation> {
    let truth: HashMap<&RecordId, &str> = records
        .iter()
        .filter(|r| r.has_label())
        .map(|r| (&r.id, r.outcome_label.as_str()))
        .collect();

    let mut per_label: BTreeMap<String, LabelStats> = BTreeMap::new();
    let mut evaluated = 0;
    let mut correct = 0;
    for p in predictions {
        let Some(&actual) = truth.get(&p.record_id) else {
            continue;
        };
        evaluated += 1;
        per_label.entry(actual.to_string()).or_default().support += 1;
        let predicted = per_label.entry(p.label.clone()).or_default();
        predicted.predicted += 1;
        if p.label == actual {
            predicted.correct += 1;
            correct += 1;
        }
    }

    (evaluated > 0).then(|| Evaluation {
        evaluated,
        correct,
        accuracy: ratio(correct, evaluated),
        per_label,
    })
}
