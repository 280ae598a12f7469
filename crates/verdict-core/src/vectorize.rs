//! Bag-of-words count vectors.
//!
//! Fitting and applying are separate steps: [`Vectorizer::fit`] produces a
//! [`Vocabulary`], which can be saved, reloaded and applied to any later batch
//! without change.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::{Document, FeatureRow, FeatureVector};

pub const DEFAULT_MAX_FEATURES: usize = 2500;

/// Split a token the way a default count vectorizer does: on every
/// non-word character, keeping fragments of two or more characters.
pub fn analyze_token(token: &str) -> impl Iterator<Item = &str> {
    token
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|frag| frag.chars().count() >= 2)
}

// ── Vocabulary ───────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    terms: Vec<String>,
}

/// Term → column mapping. Columns are in lexicographic term order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyFile", into = "VocabularyFile")]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
}

impl TryFrom<VocabularyFile> for Vocabulary {
    type Error = String;

    fn try_from(file: VocabularyFile) -> Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(file.terms.len());
        for (col, term) in file.terms.iter().enumerate() {
            if index.insert(term.clone(), col).is_some() {
                return Err(format!("duplicate term {term:?}"));
            }
        }
        Ok(Self {
            terms: file.terms,
            index,
        })
    }
}

impl From<Vocabulary> for VocabularyFile {
    fn from(v: Vocabulary) -> Self {
        Self { terms: v.terms }
    }
}

impl Vocabulary {
    /// Build from an arbitrary set of terms; duplicates collapse and columns
    /// are assigned in sorted order.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms: Vec<String> = terms.into_iter().map(Into::into).collect();
        terms.sort();
        terms.dedup();
        let index = terms
            .iter()
            .enumerate()
            .map(|(col, t)| (t.clone(), col))
            .collect();
        Self { terms, index }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn column(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Count vector for one token sequence. Out-of-vocabulary terms are dropped.
    pub fn transform(&self, tokens: &[String]) -> FeatureVector {
        let mut counts = vec![0u32; self.terms.len()];
        for token in tokens {
            for term in analyze_token(token) {
                if let Some(col) = self.column(term) {
                    counts[col] = counts[col].saturating_add(1);
                }
            }
        }
        FeatureVector(counts)
    }

    pub fn transform_documents(&self, docs: &[Document]) -> Vec<FeatureRow> {
        docs.iter()
            .map(|d| FeatureRow {
                record_id: d.record_id.clone(),
                vector: self.transform(&d.tokens),
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let file = File::create(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self).map_err(|e| CoreError::VocabularyArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let file = File::open(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let vocab: Self =
            serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
                CoreError::VocabularyArtifact {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?;
        debug!(path = %path.display(), terms = vocab.len(), "loaded vocabulary");
        Ok(vocab)
    }
}

// ── Vectorizer ───────────────────────────────────────────────────────────

/// Selects the most frequent terms of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vectorizer {
    pub max_features: usize,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

impl Vectorizer {
    pub fn new(max_features: usize) -> Self {
        Self { max_features }
    }

    /// Keep the `max_features` terms with the highest total count across all
    /// documents. Equal counts are ordered by term so the cut is reproducible.
    pub fn fit(&self, docs: &[Document]) -> Vocabulary {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for doc in docs {
            for token in &doc.tokens {
                for term in analyze_token(token) {
                    *counts.entry(term).or_default() += 1;
                }
            }
        }
        let distinct = counts.len();

        let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features);

        let vocab = Vocabulary::from_terms(ranked.into_iter().map(|(t, _)| t));
        debug!(
            documents = docs.len(),
            distinct_terms = distinct,
            kept = vocab.len(),
            "fitted vocabulary"
        );
        vocab
    }

    pub fn fit_transform(&self, docs: &[Document]) -> (Vocabulary, Vec<FeatureRow>) {
        let vocab = self.fit(docs);
        let rows = vocab.transform_documents(docs);
        (vocab, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;

    fn doc(i: usize, text: &str) -> Document {
        Document {
            record_id: RecordId::from_index(i),
            tokens: text.split_whitespace().map(str::to_string).collect(),
        }
    }

    #[test]
    fn analyzer_splits_on_non_word_chars() {
        let parts: Vec<&str> = analyze_token("plaintiff’s+claim=x").collect();
        assert_eq!(parts, vec!["plaintiff", "claim"]);
    }

    #[test]
    fn columns_are_sorted_terms() {
        let docs = vec![doc(0, "zeta alpha alpha"), doc(1, "mid zeta")];
        let (vocab, rows) = Vectorizer::default().fit_transform(&docs);
        assert_eq!(vocab.terms(), &["alpha", "mid", "zeta"]);
        assert_eq!(rows[0].vector.counts(), &[2, 0, 1]);
        assert_eq!(rows[1].vector.counts(), &[0, 1, 1]);
    }

    #[test]
    fn cap_breaks_ties_lexicographically() {
        let docs = vec![doc(0, "bbb aaa ccc ddd ddd")];
        let vocab = Vectorizer::new(2).fit(&docs);
        // ddd is most frequent; aaa wins the tie over bbb and ccc
        assert_eq!(vocab.terms(), &["aaa", "ddd"]);
    }

    #[test]
    fn unknown_terms_are_dropped() {
        let vocab = Vocabulary::from_terms(["appeal", "court"]);
        let tokens: Vec<String> = ["court", "tribunal", "court"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let v = vocab.transform(&tokens);
        assert_eq!(v.counts(), &[0, 2]);
    }

    #[test]
    fn duplicate_terms_rejected_on_load() {
        let err = serde_json::from_str::<Vocabulary>(r#"{"terms":["a1","a1"]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn save_then_load_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        let vocab = Vocabulary::from_terms(["court", "appeal", "dismiss"]);
        vocab.save(&path).unwrap();
        let loaded = Vocabulary::load(&path).unwrap();
        assert_eq!(loaded, vocab);
        assert_eq!(loaded.column("court"), Some(1));
    }
}
