// End-to-end checks of the batch classification pipeline: text stages,
// vocabulary fit/apply, model loading and evaluation.

use std::io::Write;

use verdict_core::classifier::{Classifier, KnnModel, Metric, Weights};
use verdict_core::evaluate::evaluate;
use verdict_core::pipeline::{ClassificationPipeline, VocabularySource};
use verdict_core::records;
use verdict_core::vectorize::{Vectorizer, Vocabulary};
use verdict_core::{CaseRecord, CoreError, FeatureVector, RecordId};

// ── helpers ──────────────────────────────────────────────────────────────

fn record(i: usize, title: &str, body: &str, label: &str) -> CaseRecord {
    CaseRecord::new(RecordId::from_index(i), title, body, label)
}

fn training_set() -> Vec<CaseRecord> {
    vec![
        record(0, "Smith v Jones", "The appeal was dismissed with costs.", "dismissed"),
        record(1, "Brown v State", "Appeal dismissed; the tribunal erred.", "dismissed"),
        record(2, "Re Estate", "The court applied the principle and granted relief.", "applied"),
        record(3, "Lee v Lee", "Principle applied; relief granted to the applicant.", "applied"),
    ]
}

/// Fit a vocabulary on the training set and package its vectors as a model.
fn trained(pipeline: &ClassificationPipeline, k: usize) -> (Vocabulary, KnnModel) {
    let train = training_set();
    let docs = pipeline.preprocess_batch(&train);
    let (vocab, rows) = pipeline.vectorizer().fit_transform(&docs);
    let labeled = train
        .iter()
        .zip(rows)
        .map(|(r, row)| (r.outcome_label.clone(), row.vector))
        .collect();
    let model = KnnModel::from_labeled_vectors(
        k,
        Metric::Euclidean,
        Weights::Uniform,
        Some(vocab.clone()),
        vocab.len(),
        labeled,
    )
    .unwrap();
    (vocab, model)
}

// =============================================================================
// Text stages
// =============================================================================

#[test]
fn test_preprocess_runs_every_stage() {
    let pipeline = ClassificationPipeline::default();
    let doc = pipeline.preprocess(&record(7, "Privacy Policy:", "The Court ruled.", ""));
    assert_eq!(doc.record_id, RecordId::from_index(7));
    assert_eq!(doc.tokens, vec!["court", "rule"]);
}

#[test]
fn test_preprocess_is_deterministic() {
    let pipeline = ClassificationPipeline::default();
    let r = record(0, "Appeal", "The appellants were dismissed and are appealing again.", "");
    assert_eq!(pipeline.preprocess(&r), pipeline.preprocess(&r));
}

// =============================================================================
// Vectors and predictions
// =============================================================================

#[test]
fn test_stop_word_documents_yield_zero_vectors_and_labels() {
    let pipeline = ClassificationPipeline::default();
    let (vocab, model) = trained(&pipeline, 1);
    let batch: Vec<CaseRecord> = (0..3).map(|i| record(i, "it is", "a to", "")).collect();

    let docs = pipeline.preprocess_batch(&batch);
    let rows = vocab.transform_documents(&docs);
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.vector.is_zero() && r.vector.len() == vocab.len()));

    let preds = pipeline.classify(&batch, &vocab, &model).unwrap();
    assert_eq!(preds.len(), 3);
    assert!(preds.iter().all(|p| !p.label.is_empty()));
}

#[test]
fn test_identical_token_multisets_get_identical_labels() {
    let pipeline = ClassificationPipeline::default();
    let (vocab, model) = trained(&pipeline, 3);
    let batch = vec![
        record(0, "Appeal dismissed", "tribunal erred", ""),
        record(1, "tribunal erred", "Dismissed appeal!", ""),
    ];
    let docs = pipeline.preprocess_batch(&batch);
    let rows = vocab.transform_documents(&docs);
    assert_eq!(rows[0].vector, rows[1].vector);

    let preds = pipeline.classify(&batch, &vocab, &model).unwrap();
    assert_eq!(preds[0].label, preds[1].label);
    assert_eq!(preds[0].label, "dismissed");
}

#[test]
fn test_vector_width_is_min_of_cap_and_distinct_terms() {
    let pipeline = ClassificationPipeline::new(
        Default::default(),
        Default::default(),
        Vectorizer::new(3),
    );
    let vocab = pipeline.fit_vocabulary(&training_set());
    assert_eq!(vocab.len(), 3);

    let uncapped = ClassificationPipeline::default().fit_vocabulary(&training_set());
    assert!(uncapped.len() < 2500);
    let docs = ClassificationPipeline::default().preprocess_batch(&training_set());
    for row in uncapped.transform_documents(&docs) {
        assert_eq!(row.vector.len(), uncapped.len());
    }
}

#[test]
fn test_predictions_carry_record_ids_in_input_order() {
    let pipeline = ClassificationPipeline::default();
    let (vocab, model) = trained(&pipeline, 1);
    let batch = vec![
        CaseRecord::new(RecordId("z-9".into()), "", "relief granted, principle applied", ""),
        CaseRecord::new(RecordId("a-1".into()), "", "appeal dismissed", ""),
    ];
    let preds = pipeline.classify(&batch, &vocab, &model).unwrap();
    let ids: Vec<&str> = preds.iter().map(|p| p.record_id.0.as_str()).collect();
    assert_eq!(ids, vec!["z-9", "a-1"]);
    assert_eq!(preds[0].label, "applied");
    assert_eq!(preds[1].label, "dismissed");
}

// =============================================================================
// Vocabulary resolution
// =============================================================================

#[test]
fn test_model_vocabulary_is_used_when_no_explicit_one() {
    let pipeline = ClassificationPipeline::default();
    let (vocab, model) = trained(&pipeline, 1);
    match VocabularySource::resolve(None, &model) {
        VocabularySource::Frozen(v) => assert_eq!(v, &vocab),
        VocabularySource::RefitBatch => panic!("expected the model vocabulary"),
    }

    let explicit = Vocabulary::from_terms(["appeal"]);
    match VocabularySource::resolve(Some(&explicit), &model) {
        VocabularySource::Frozen(v) => assert_eq!(v.terms(), &["appeal"]),
        VocabularySource::RefitBatch => panic!("expected the explicit vocabulary"),
    }
}

#[test]
fn test_refit_runs_when_nothing_is_frozen() {
    let pipeline = ClassificationPipeline::default();
    let model = KnnModel::from_labeled_vectors(
        1,
        Metric::Euclidean,
        Weights::Uniform,
        None,
        2500,
        vec![("cited".into(), FeatureVector::zeros(2500))],
    )
    .unwrap();
    let source = VocabularySource::resolve(None, &model);
    let report = pipeline.run(&training_set(), source, &model).unwrap();
    assert!(report.refit_vocabulary);
    assert_eq!(report.predictions.len(), 4);
    assert!(report.predictions.iter().all(|p| p.label == "cited"));
}

#[test]
fn test_refit_wider_than_model_is_rejected() {
    let pipeline = ClassificationPipeline::default();
    let model = KnnModel::from_labeled_vectors(
        1,
        Metric::Euclidean,
        Weights::Uniform,
        None,
        1,
        vec![("cited".into(), FeatureVector::zeros(1))],
    )
    .unwrap();
    let err = pipeline
        .run(&training_set(), VocabularySource::RefitBatch, &model)
        .unwrap_err();
    assert!(matches!(err, CoreError::DimensionMismatch { expected: 1, .. }));
}

// =============================================================================
// Artifacts on disk
// =============================================================================

#[test]
fn test_saved_model_and_vocabulary_reload_to_same_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ClassificationPipeline::default();
    let (vocab, model) = trained(&pipeline, 1);

    let model_path = dir.path().join("model.json");
    let vocab_path = dir.path().join("vocab.json");
    model.save(&model_path).unwrap();
    vocab.save(&vocab_path).unwrap();

    let reloaded = KnnModel::load(&model_path).unwrap();
    let reloaded_vocab = Vocabulary::load(&vocab_path).unwrap();
    assert_eq!(reloaded.n_features(), vocab.len());
    assert_eq!(reloaded.vocabulary(), Some(&reloaded_vocab));

    let batch = training_set();
    assert_eq!(
        pipeline.classify(&batch, &vocab, &model).unwrap(),
        pipeline.classify(&batch, &reloaded_vocab, &reloaded).unwrap()
    );
}

#[test]
fn test_missing_model_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = KnnModel::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, CoreError::ModelArtifact { .. }));
}

#[test]
fn test_malformed_model_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"format_version": 1, "k": 3}}"#).unwrap();
    let err = KnnModel::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("malformed artifact"));
}

#[test]
fn test_unsupported_format_version_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"format_version": 2, "k": 1, "n_features": 1, "samples": [{{"label": "x", "counts": []}}]}}"#
    )
    .unwrap();
    assert!(KnnModel::load(file.path()).is_err());
}

// =============================================================================
// CSV in, evaluation out
// =============================================================================

#[test]
fn test_csv_batch_evaluates_against_labels() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "case_id,case_title,case_outcome,case_text").unwrap();
    writeln!(file, "c1,Appeal,dismissed,\"The appeal was dismissed, tribunal erred.\"").unwrap();
    writeln!(file, "c2,Relief,applied,Principle applied and relief granted.").unwrap();
    writeln!(file, "c3,Unknown,,Nothing useful here.").unwrap();

    let batch = records::load_csv(file.path()).unwrap();
    let pipeline = ClassificationPipeline::default();
    let (vocab, model) = trained(&pipeline, 1);
    let preds = pipeline.classify(&batch, &vocab, &model).unwrap();
    assert_eq!(preds.len(), 3);

    let eval = evaluate(&batch, &preds).unwrap();
    assert_eq!(eval.evaluated, 2);
    assert_eq!(eval.correct, 2);
    assert!((eval.accuracy - 1.0).abs() < 1e-9);
}

#[test]
fn test_csv_without_required_columns_is_rejected_up_front() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "title,text\nA,B").unwrap();
    let err = records::load_csv(file.path()).unwrap_err();
    assert!(matches!(err, CoreError::MissingColumns(ref cols) if cols.len() == 3));
}
