//! HTTP façade exposing retrieval and question answering.
//!
//! All loaded state (embedding engine, index, metadata, generative
//! client) lives in one immutable [`ServiceContext`] built at startup
//! and shared read-only across requests. Swapping in a freshly rebuilt
//! index requires a restart.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::answer::{compose, GenerativeModel};
use crate::errors::{Result, ScoutError};
use crate::retrieval::Retriever;
use crate::types::RetrievalResult;

const MIN_TOP_K: usize = 1;
const MAX_TOP_K: usize = 20;

/// Read-only process-wide state, constructed once at startup.
pub struct ServiceContext {
    pub retriever: Retriever,
    pub generator: Arc<dyn GenerativeModel>,
    pub model_name: String,
}

pub type SharedContext = Arc<ServiceContext>;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub question: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_top_k() -> usize {
    5
}

fn default_temperature() -> f32 {
    0.2
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub courses: Vec<RetrievalResult>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub model: String,
    pub answer: String,
    pub courses: Vec<RetrievalResult>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

type ErrorResponse = (StatusCode, Json<MessageBody>);

pub fn router(ctx: SharedContext) -> Router {
    // Wide-open CORS so a local frontend can call the API
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/retrieve", post(retrieve_handler))
        .route("/ask", post(ask_handler))
        .layer(cors)
        .with_state(ctx)
}

/// Bind and serve until shutdown.
pub async fn serve(ctx: SharedContext, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| ScoutError::Config(format!("invalid bind address {bind}: {e}")))?;

    info!(%addr, courses = ctx.retriever.course_count(), "coursescout API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}

async fn home() -> Json<MessageBody> {
    Json(MessageBody {
        message: "Welcome to the CourseScout API!".to_string(),
    })
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn retrieve_handler(
    State(ctx): State<SharedContext>,
    Json(request): Json<RetrieveRequest>,
) -> std::result::Result<Json<RetrieveResponse>, ErrorResponse> {
    validate_question(&request.question).map_err(error_response)?;
    validate_top_k(request.top_k).map_err(error_response)?;

    let courses = run_search(ctx, request.question, request.top_k)
        .await
        .map_err(error_response)?;
    Ok(Json(RetrieveResponse { courses }))
}

async fn ask_handler(
    State(ctx): State<SharedContext>,
    Json(request): Json<AskRequest>,
) -> std::result::Result<Json<AskResponse>, ErrorResponse> {
    validate_question(&request.question).map_err(error_response)?;
    validate_top_k(request.top_k).map_err(error_response)?;
    validate_temperature(request.temperature).map_err(error_response)?;

    let courses = run_search(ctx.clone(), request.question.clone(), request.top_k)
        .await
        .map_err(error_response)?;

    let answer = compose(
        &request.question,
        &courses,
        request.temperature,
        ctx.generator.as_ref(),
    )
    .await
    .map_err(error_response)?;

    Ok(Json(AskResponse {
        model: ctx.model_name.clone(),
        answer,
        courses,
    }))
}

/// Retrieval runs the embedding forward pass, so it is moved off the
/// async worker threads.
async fn run_search(
    ctx: SharedContext,
    question: String,
    top_k: usize,
) -> Result<Vec<RetrievalResult>> {
    tokio::task::spawn_blocking(move || ctx.retriever.search(&question, top_k))
        .await
        .map_err(|e| ScoutError::Embedding(format!("search task failed: {e}")))?
}

fn validate_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(ScoutError::InvalidInput(
            "question must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_top_k(top_k: usize) -> Result<()> {
    if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        return Err(ScoutError::InvalidInput(format!(
            "top_k must be between {MIN_TOP_K} and {MAX_TOP_K}"
        )));
    }
    Ok(())
}

fn validate_temperature(temperature: f32) -> Result<()> {
    if !temperature.is_finite() || !(0.0..=1.0).contains(&temperature) {
        return Err(ScoutError::InvalidInput(
            "temperature must be between 0.0 and 1.0".to_string(),
        ));
    }
    Ok(())
}

/// Invalid input maps to 400; every downstream failure collapses into a
/// 500 carrying the raw failure message.
fn error_response(err: ScoutError) -> ErrorResponse {
    let status = match err {
        ScoutError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(MessageBody {
            message: err.to_string(),
        }),
    )
}
