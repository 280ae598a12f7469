//! Batch classification: normalize → tokenize → lemmatize → vectorize → classify.

use std::borrow::Cow;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, KnnModel};
use crate::error::CoreResult;
use crate::lemmatize::Lemmatizer;
use crate::normalize::{contains_url, normalize};
use crate::tokenize::Tokenizer;
use crate::types::{CaseRecord, Document, FeatureRow, FeatureVector, Prediction};
use crate::vectorize::{Vectorizer, Vocabulary};

/// Where the feature columns for a run come from.
#[derive(Debug, Clone, Copy)]
pub enum VocabularySource<'a> {
    /// A vocabulary fitted earlier and applied unchanged.
    Frozen(&'a Vocabulary),
    /// Fit a fresh vocabulary on the batch being classified.
    RefitBatch,
}

impl<'a> VocabularySource<'a> {
    /// Explicit vocabulary first, then the one shipped with the model, then a
    /// batch refit.
    pub fn resolve(explicit: Option<&'a Vocabulary>, classifier: &'a dyn Classifier) -> Self {
        match explicit.or_else(|| classifier.vocabulary()) {
            Some(vocab) => Self::Frozen(vocab),
            None => Self::RefitBatch,
        }
    }
}

/// Result of one run, predictions in input order.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub predictions: Vec<Prediction>,
    pub vocabulary_size: usize,
    pub refit_vocabulary: bool,
    pub empty_documents: usize,
    pub records_with_links: usize,
}

/// Holds the resources built once per run: stop words, the lemmatizer
/// lexicon and the feature cap.
#[derive(Debug, Clone, Default)]
pub struct ClassificationPipeline {
    tokenizer: Tokenizer,
    lemmatizer: Lemmatizer,
    vectorizer: Vectorizer,
}

impl ClassificationPipeline {
    pub fn new(tokenizer: Tokenizer, lemmatizer: Lemmatizer, vectorizer: Vectorizer) -> Self {
        Self {
            tokenizer,
            lemmatizer,
            vectorizer,
        }
    }

    /// English stop words and verbs, optionally extended from a lexicon file.
    pub fn with_lexicon(max_features: usize, lexicon: Option<&Path>) -> CoreResult<Self> {
        let mut lemmatizer = Lemmatizer::english();
        if let Some(path) = lexicon {
            let added = lemmatizer.extend_from_file(path)?;
            info!(
                path = %path.display(),
                added,
                verbs = lemmatizer.lexicon_len(),
                "loaded lexicon"
            );
        }
        Ok(Self::new(
            Tokenizer::default(),
            lemmatizer,
            Vectorizer::new(max_features),
        ))
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Text stages for one record.
    pub fn preprocess(&self, record: &CaseRecord) -> Document {
        let cleaned = normalize(record.combined_text());
        let tokens = self.tokenizer.tokenize(&cleaned);
        Document {
            record_id: record.id.clone(),
            tokens: self.lemmatizer.lemmatize_all(&tokens),
        }
    }

    pub fn preprocess_batch(&self, records: &[CaseRecord]) -> Vec<Document> {
        records.iter().map(|r| self.preprocess(r)).collect()
    }

    /// Fit phase: choose the feature columns from a batch of records.
    pub fn fit_vocabulary(&self, records: &[CaseRecord]) -> Vocabulary {
        self.vectorizer.fit(&self.preprocess_batch(records))
    }

    /// Apply phase with a frozen vocabulary.
    pub fn classify(
        &self,
        records: &[CaseRecord],
        vocabulary: &Vocabulary,
        classifier: &dyn Classifier,
    ) -> CoreResult<Vec<Prediction>> {
        let docs = self.preprocess_batch(records);
        let rows = vocabulary.transform_documents(&docs);
        predict_rows(rows, classifier)
    }

    /// Full run with diagnostics.
    pub fn run(
        &self,
        records: &[CaseRecord],
        source: VocabularySource<'_>,
        classifier: &dyn Classifier,
    ) -> CoreResult<ClassificationReport> {
        let records_with_links = records
            .iter()
            .filter(|r| contains_url(r.combined_text()))
            .count();
        debug!(records = records.len(), records_with_links, "normalizing batch");

        let docs = self.preprocess_batch(records);
        let empty_documents = docs.iter().filter(|d| d.tokens.is_empty()).count();
        debug!(documents = docs.len(), empty_documents, "text stages complete");

        let (vocabulary, refit) = match source {
            VocabularySource::Frozen(v) => (Cow::Borrowed(v), false),
            VocabularySource::RefitBatch => {
                warn!(
                    documents = docs.len(),
                    "no frozen vocabulary; refitting on this batch, columns may not match training"
                );
                (Cow::Owned(self.vectorizer.fit(&docs)), true)
            }
        };
        if vocabulary.len() != classifier.n_features() {
            warn!(
                vocabulary = vocabulary.len(),
                model = classifier.n_features(),
                "vocabulary width differs from model"
            );
        }

        let rows = vocabulary.transform_documents(&docs);
        let predictions = predict_rows(rows, classifier)?;
        info!(
            records = records.len(),
            vocabulary = vocabulary.len(),
            refit,
            "classified batch"
        );

        Ok(ClassificationReport {
            predictions,
            vocabulary_size: vocabulary.len(),
            refit_vocabulary: refit,
            empty_documents,
            records_with_links,
        })
    }
}

fn predict_rows(rows: Vec<FeatureRow>, classifier: &dyn Classifier) -> CoreResult<Vec<Prediction>> {
    let (ids, vectors): (Vec<_>, Vec<FeatureVector>) =
        rows.into_iter().map(|r| (r.record_id, r.vector)).unzip();
    let labels = classifier.predict(&vectors)?;
    Ok(ids
        .into_iter()
        .zip(labels)
        .map(|(record_id, label)| Prediction { record_id, label })
        .collect())
}

// ── Loaded classifier ────────────────────────────────────────────────────

/// Everything a run needs, loaded once: the pipeline, the model and an
/// optional frozen vocabulary that overrides the model's own.
#[derive(Debug)]
pub struct LoadedClassifier {
    pub pipeline: ClassificationPipeline,
    pub model: KnnModel,
    pub vocabulary: Option<Vocabulary>,
}

impl LoadedClassifier {
    pub fn load(
        model_path: &Path,
        vocabulary_path: Option<&Path>,
        lexicon_path: Option<&Path>,
        max_features: usize,
    ) -> CoreResult<Self> {
        let model = KnnModel::load(model_path)?;
        let vocabulary = vocabulary_path.map(Vocabulary::load).transpose()?;
        let pipeline = ClassificationPipeline::with_lexicon(max_features, lexicon_path)?;
        Ok(Self {
            pipeline,
            model,
            vocabulary,
        })
    }

    pub fn source(&self) -> VocabularySource<'_> {
        VocabularySource::resolve(self.vocabulary.as_ref(), &self.model)
    }

    pub fn run(&self, records: &[CaseRecord]) -> CoreResult<ClassificationReport> {
        self.pipeline.run(records, self.source(), &self.model)
    }
}
