use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};
use verdict_agent::analysis::{analyze_case, assess_validity};
use verdict_core::{
    classifier::Classifier,
    evaluate::evaluate,
    flowchart::{Flowchart, Validity},
    records, CaseRecord, CoreError, RecordId,
};

use crate::AppState;

pub(crate) const SESSION_HEADER: &str = "x-session-id";
const DEFAULT_SESSION: &str = "default";

// ── Error helpers ─────────────────────────────────────────────────────────

pub(crate) type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": msg.into() })))
}

pub(crate) fn internal(e: impl std::fmt::Display) -> ApiError {
    error!("internal error: {e}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

// ── Request body types ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct ValidityBody {
    #[serde(default)]
    pub description: String,
    pub settlement: Option<bool>,
    pub court: Option<bool>,
}

#[derive(Deserialize)]
pub(crate) struct QuestionBody {
    #[serde(default)]
    pub question: String,
}

#[derive(Deserialize)]
pub(crate) struct FlowchartBody {
    pub validity: Validity,
    pub settlement: Option<bool>,
    pub court: Option<bool>,
}

#[derive(Deserialize)]
pub(crate) struct ClassifyRecord {
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub outcome: String,
}

#[derive(Deserialize)]
pub(crate) struct ClassifyBody {
    pub records: Vec<ClassifyRecord>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let model = state.classifier.as_ref().map(|c| {
        json!({
            "k": c.model.k(),
            "samples": c.model.sample_count(),
            "n_features": c.model.n_features(),
        })
    });
    Json(json!({ "status": "ok", "model": model }))
}

// Case analysis

pub(crate) async fn analyze(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(case_data): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let session = session_id(&headers);
    let analysis = analyze_case(state.llm.as_ref(), &case_data)
        .await
        .map_err(|e| {
            warn!(session = %session, "case analysis failed: {e:#}");
            api_error(StatusCode::BAD_GATEWAY, "Failed to get response from LLM API")
        })?;
    state.sessions.lock().await.insert(session, analysis.clone());
    Ok(Json(analysis))
}

pub(crate) async fn export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let analysis = state
        .sessions
        .lock()
        .await
        .get(&session_id(&headers))
        .cloned()
        .unwrap_or_else(|| json!({}));
    (
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=case_analysis.json",
        )],
        Json(analysis),
    )
}

pub(crate) async fn define(
    State(state): State<Arc<AppState>>,
    Path(term): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.dictionary.is_configured() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Legal dictionary is not configured",
        ));
    }
    state.dictionary.define(&term).await.map(Json).map_err(|e| {
        warn!(term = %term, "definition lookup failed: {e:#}");
        api_error(StatusCode::BAD_GATEWAY, "Failed to get definition")
    })
}

// Validity and flowchart

pub(crate) async fn validity(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ValidityBody>,
) -> Result<Json<Value>, ApiError> {
    let description = body.description.trim();
    if description.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Please enter a case description.",
        ));
    }
    let assessment = assess_validity(state.llm.as_ref(), description).await;
    let chart = Flowchart::build(assessment.validity, body.settlement, body.court);
    Ok(Json(json!({
        "validity": assessment.validity,
        "reasoning": assessment.reasoning,
        "flowchart": flowchart_json(&chart),
    })))
}

pub(crate) async fn question(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QuestionBody>,
) -> Result<Json<Value>, ApiError> {
    let question = body.question.trim();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Please enter a question."));
    }
    let assessment = assess_validity(state.llm.as_ref(), question).await;
    Ok(Json(json!({ "response": assessment.reasoning })))
}

pub(crate) async fn flowchart(Json(body): Json<FlowchartBody>) -> Json<Value> {
    let chart = Flowchart::build(body.validity, body.settlement, body.court);
    Json(flowchart_json(&chart))
}

fn flowchart_json(chart: &Flowchart) -> Value {
    json!({
        "nodes": chart.nodes,
        "edges": chart.edges,
        "mermaid": chart.to_mermaid(),
    })
}

// Classification

fn records_from_json(body: ClassifyBody) -> Result<Vec<CaseRecord>, ApiError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(body.records.len());
    for (i, r) in body.records.into_iter().enumerate() {
        let id = match r.id.filter(|s| !s.trim().is_empty()) {
            Some(id) => RecordId(id),
            None => RecordId::from_index(i),
        };
        if !seen.insert(id.clone()) {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("duplicate record id {:?}", id.0),
            ));
        }
        out.push(CaseRecord::new(id, r.title, r.body, r.outcome.trim()));
    }
    Ok(out)
}

pub(crate) async fn classify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Some(classifier) = state.classifier.clone() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "No classification model is loaded",
        ));
    };

    let is_csv = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/csv"));
    let batch = if is_csv {
        records::from_reader(body.as_ref()).map_err(|e| match e {
            CoreError::MissingColumns(_) | CoreError::DuplicateRecordId(_) | CoreError::Csv(_) => {
                api_error(StatusCode::BAD_REQUEST, e.to_string())
            }
            other => internal(other),
        })?
    } else {
        let parsed: ClassifyBody = serde_json::from_slice(&body)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid body: {e}")))?;
        records_from_json(parsed)?
    };

    let (batch, report) = tokio::task::spawn_blocking(move || {
        let report = classifier.run(&batch);
        (batch, report)
    })
    .await
    .map_err(internal)?;
    let report = report.map_err(internal)?;

    let evaluation = evaluate(&batch, &report.predictions);
    info!(
        records = batch.len(),
        accuracy = evaluation.as_ref().map(|e| e.accuracy),
        "classification request served"
    );
    Ok(Json(json!({
        "predictions": report.predictions,
        "vocabulary_size": report.vocabulary_size,
        "refit_vocabulary": report.refit_vocabulary,
        "empty_documents": report.empty_documents,
        "evaluation": evaluation,
    })))
}

// Log stream

pub(crate) async fn sse_logs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    // Subscribe before snapshotting ring to avoid race
    let live_rx = state.log_tx.subscribe();
    let history: Vec<String> = state
        .log_ring
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .cloned()
        .collect();
    tokio::spawn(async move {
        for line in history {
            if tx.send(line).is_err() {
                return;
            }
        }
        let mut live_rx = live_rx;
        loop {
            match live_rx.recv().await {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });
    let stream = UnboundedReceiverStream::new(rx)
        .map(|data| Ok::<_, std::convert::Infallible>(Event::default().data(data)));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}
