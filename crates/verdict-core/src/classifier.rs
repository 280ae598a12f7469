//! Nearest-neighbour classifier over count vectors.
//!
//! The model artifact is produced outside this crate; here it is only loaded,
//! validated and applied. The on-disk form is JSON with sparse sample rows.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::types::FeatureVector;
use crate::vectorize::Vocabulary;

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Anything that maps a batch of feature vectors to labels, one per row.
pub trait Classifier: Send + Sync {
    fn predict(&self, rows: &[FeatureVector]) -> CoreResult<Vec<String>>;

    /// Width of the feature space the classifier was built for.
    fn n_features(&self) -> usize;

    /// Vocabulary the classifier was trained on, if it ships one.
    fn vocabulary(&self) -> Option<&Vocabulary> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Euclidean,
    Manhattan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weights {
    #[default]
    Uniform,
    /// Inverse distance. An exact match outvotes everything else.
    Distance,
}

// ── Artifact ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSample {
    pub label: String,
    /// `(column, count)` pairs for the non-zero columns.
    pub counts: Vec<(usize, u32)>,
}

/// Serialized model as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub k: usize,
    #[serde(default)]
    pub metric: Metric,
    #[serde(default)]
    pub weights: Weights,
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vocabulary>,
    pub samples: Vec<LabeledSample>,
}

// ── Model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Sample {
    label: String,
    /// Sorted by column.
    counts: Vec<(usize, u32)>,
}

#[derive(Debug, Clone)]
pub struct KnnModel {
    k: usize,
    metric: Metric,
    weights: Weights,
    n_features: usize,
    vocabulary: Option<Vocabulary>,
    samples: Vec<Sample>,
}

impl KnnModel {
    /// Load and validate a model artifact. Any failure here is fatal for the
    /// caller; there is no fallback model.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let file = File::open(path).map_err(|e| CoreError::ModelArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let artifact: ModelArtifact = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| CoreError::ModelArtifact {
                path: path.to_path_buf(),
                reason: format!("malformed artifact: {e}"),
            })?;
        let model = Self::from_artifact(artifact, path)?;
        info!(
            path = %path.display(),
            k = model.k,
            samples = model.samples.len(),
            n_features = model.n_features,
            has_vocabulary = model.vocabulary.is_some(),
            "loaded nearest-neighbour model"
        );
        Ok(model)
    }

    pub fn from_artifact(artifact: ModelArtifact, origin: &Path) -> CoreResult<Self> {
        let invalid = |reason: String| CoreError::ModelArtifact {
            path: origin.to_path_buf(),
            reason,
        };

        if artifact.format_version != MODEL_FORMAT_VERSION {
            return Err(invalid(format!(
                "unsupported format_version {} (expected {MODEL_FORMAT_VERSION})",
                artifact.format_version
            )));
        }
        if artifact.k == 0 {
            return Err(invalid("k must be at least 1".into()));
        }
        if artifact.samples.is_empty() {
            return Err(invalid("artifact has no samples".into()));
        }
        if let Some(vocab) = &artifact.vocabulary {
            if vocab.len() != artifact.n_features {
                return Err(invalid(format!(
                    "vocabulary has {} terms but n_features is {}",
                    vocab.len(),
                    artifact.n_features
                )));
            }
        }

        let mut samples = Vec::with_capacity(artifact.samples.len());
        for (i, s) in artifact.samples.into_iter().enumerate() {
            if s.label.is_empty() {
                return Err(invalid(format!("sample {i} has an empty label")));
            }
            if let Some(&(col, _)) = s.counts.iter().find(|(col, _)| *col >= artifact.n_features) {
                return Err(invalid(format!(
                    "sample {i} references column {col} beyond n_features {}",
                    artifact.n_features
                )));
            }
            let mut counts: Vec<(usize, u32)> =
                s.counts.into_iter().filter(|&(_, c)| c > 0).collect();
            counts.sort_unstable_by_key(|&(col, _)| col);
            if let Some(pair) = counts.windows(2).find(|w| w[0].0 == w[1].0) {
                return Err(invalid(format!(
                    "sample {i} lists column {} more than once",
                    pair[0].0
                )));
            }
            samples.push(Sample {
                label: s.label,
                counts,
            });
        }

        Ok(Self {
            k: artifact.k,
            metric: artifact.metric,
            weights: artifact.weights,
            n_features: artifact.n_features,
            vocabulary: artifact.vocabulary,
            samples,
        })
    }

    /// Package labelled vectors as a model. Used to produce artifacts from
    /// vectors computed elsewhere.
    pub fn from_labeled_vectors(
        k: usize,
        metric: Metric,
        weights: Weights,
        vocabulary: Option<Vocabulary>,
        n_features: usize,
        labeled: Vec<(String, FeatureVector)>,
    ) -> CoreResult<Self> {
        let samples = labeled
            .into_iter()
            .map(|(label, v)| LabeledSample {
                label,
                counts: v
                    .counts()
                    .iter()
                    .enumerate()
                    .filter(|&(_, &c)| c > 0)
                    .map(|(col, &c)| (col, c))
                    .collect(),
            })
            .collect();
        Self::from_artifact(
            ModelArtifact {
                format_version: MODEL_FORMAT_VERSION,
                k,
                metric,
                weights,
                n_features,
                vocabulary,
                samples,
            },
            Path::new("<in-memory>"),
        )
    }

    pub fn to_artifact(&self) -> ModelArtifact {
        ModelArtifact {
            format_version: MODEL_FORMAT_VERSION,
            k: self.k,
            metric: self.metric,
            weights: self.weights,
            n_features: self.n_features,
            vocabulary: self.vocabulary.clone(),
            samples: self
                .samples
                .iter()
                .map(|s| LabeledSample {
                    label: s.label.clone(),
                    counts: s.counts.clone(),
                })
                .collect(),
        }
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let file = File::create(path).map_err(|source| CoreError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        serde_json::to_writer(file, &self.to_artifact()).map_err(|e| CoreError::ModelArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Distance under the model metric, kept in integer space. For the
    /// euclidean metric this is the squared distance, which orders the same.
    fn raw_distance(&self, row: &[u32], sample: &Sample) -> u64 {
        let at = |col: usize| u64::from(row.get(col).copied().unwrap_or(0));
        match self.metric {
            Metric::Euclidean => {
                let mut total: u64 = row.iter().map(|&c| u64::from(c) * u64::from(c)).sum();
                for &(col, c) in &sample.counts {
                    let r = at(col);
                    let d = r.abs_diff(u64::from(c));
                    total = total - r * r + d * d;
                }
                total
            }
            Metric::Manhattan => {
                let mut total: u64 = row.iter().map(|&c| u64::from(c)).sum();
                for &(col, c) in &sample.counts {
                    let r = at(col);
                    total = total - r + r.abs_diff(u64::from(c));
                }
                total
            }
        }
    }

    fn true_distance(&self, raw: u64) -> f64 {
        match self.metric {
            Metric::Euclidean => (raw as f64).sqrt(),
            Metric::Manhattan => raw as f64,
        }
    }

    fn predict_row(&self, row: &[u32]) -> String {
        let mut ranked: Vec<(u64, usize)> = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| (self.raw_distance(row, s), i))
            .collect();
        let k = self.k.min(ranked.len());
        if k < ranked.len() {
            ranked.select_nth_unstable(k - 1);
            ranked.truncate(k);
        }
        ranked.sort_unstable();

        let exact_match = ranked.iter().any(|&(d, _)| d == 0);
        let mut votes: BTreeMap<&str, f64> = BTreeMap::new();
        for &(raw, i) in &ranked {
            let weight = match self.weights {
                Weights::Uniform => 1.0,
                Weights::Distance if exact_match => {
                    if raw == 0 {
                        1.0
                    } else {
                        0.0
                    }
                }
                Weights::Distance => 1.0 / self.true_distance(raw),
            };
            *votes.entry(self.samples[i].label.as_str()).or_default() += weight;
        }

        // BTreeMap iterates labels in order, so a strict `>` keeps the
        // smallest label on ties.
        let mut best: Option<(&str, f64)> = None;
        for (label, score) in votes {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((label, score));
            }
        }
        best.map(|(l, _)| l.to_string()).unwrap_or_default()
    }
}

impl Classifier for KnnModel {
    fn predict(&self, rows: &[FeatureVector]) -> CoreResult<Vec<String>> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() > self.n_features {
                return Err(CoreError::DimensionMismatch {
                    row: i,
                    got: row.len(),
                    expected: self.n_features,
                });
            }
        }
        let labels: Vec<String> = rows.iter().map(|r| self.predict_row(r.counts())).collect();
        debug!(rows = rows.len(), k = self.k, "knn batch predicted");
        Ok(labels)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }
}
