//! REST API server for the financial insight dashboard
//!
//! Every request carries its own data: uploads are analyzed in memory and
//! chat requests bring the summary (or the CSV) they ask about.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::advisor::{CompletionProvider, FinancialAdvisor};
use crate::aggregator::SummaryStatistics;
use crate::charts::ChartBuilder;
use crate::config::AppConfig;
use crate::error::InsightError;
use crate::gemini::GeminiClient;
use crate::pipeline;
use crate::prompt::PromptContextBuilder;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
    /// Summary returned by a previous analysis
    #[serde(default)]
    pub summary: Option<SummaryStatistics>,
    /// Raw CSV, analyzed on the fly when no summary is given
    #[serde(default)]
    pub csv: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn reject(status: StatusCode, message: impl Into<String>) -> ApiResult {
    (status, Json(ApiResponse::error(message.into())))
}

/// Map an error onto a status and a user-facing message
fn error_response(e: &InsightError) -> ApiResult {
    if e.is_client_error() {
        return reject(StatusCode::BAD_REQUEST, e.to_string());
    }

    match e {
        InsightError::FeatureUnavailable(_) => reject(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        InsightError::ContextTooLarge { .. } => {
            warn!("Prompt context could not be reduced: {}", e);
            reject(
                StatusCode::SERVICE_UNAVAILABLE,
                "The financial assistant is unavailable right now. Please try again later.",
            )
        }
        InsightError::ExternalService(_) | InsightError::HttpError(_) => reject(
            StatusCode::BAD_GATEWAY,
            format!("The financial assistant could not answer: {}", e),
        ),
        _ => {
            error!("Request failed: {}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub advisor: Arc<FinancialAdvisor>,
    pub charts: Arc<ChartBuilder>,
    pub sample_data_path: Arc<PathBuf>,
}

impl ApiState {
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let provider: Option<Arc<dyn CompletionProvider>> = match &config.gemini {
            Some(gemini) => {
                info!(models = ?gemini.models, "Financial assistant enabled");
                Some(Arc::new(GeminiClient::new(gemini.clone())?))
            }
            None => {
                warn!("GEMINI_API_KEY not set; financial assistant disabled");
                None
            }
        };

        let advisor = FinancialAdvisor::new(
            provider,
            PromptContextBuilder::new(config.prompt_context_max_chars, config.currency_symbol.clone()),
            config.advisor_fallback,
        );

        Ok(Self {
            advisor: Arc::new(advisor),
            charts: Arc::new(ChartBuilder::new(config.currency_symbol.clone())),
            sample_data_path: Arc::new(config.sample_data_path.clone()),
        })
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "chat_available": state.advisor.is_available(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Analysis Endpoints
/// =============================

fn analysis_response(state: &ApiState, csv: &str) -> ApiResult {
    match pipeline::analyze(csv, &state.charts) {
        Ok(analysis) => {
            info!(
                rows = analysis.rows,
                warnings = analysis.warnings.len(),
                "Analysis completed"
            );
            (StatusCode::OK, Json(ApiResponse::success(analysis)))
        }
        Err(e) => {
            warn!("Analysis failed: {}", e);
            error_response(&e)
        }
    }
}

async fn upload(State(state): State<ApiState>, mut multipart: Multipart) -> ApiResult {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return reject(e.status(), format!("Invalid upload: {}", e.body_text())),
        };

        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().trim().to_string();
        if file_name.is_empty() {
            return reject(StatusCode::BAD_REQUEST, "No file selected");
        }
        if !file_name.to_lowercase().ends_with(".csv") {
            return reject(StatusCode::BAD_REQUEST, "Please upload a CSV file");
        }

        let text = match field.text().await {
            Ok(text) => text,
            Err(e) => return reject(e.status(), format!("Error reading CSV file: {}", e.body_text())),
        };

        info!(file = %file_name, bytes = text.len(), "Received CSV upload");
        return analysis_response(&state, &text);
    }

    reject(StatusCode::BAD_REQUEST, "No file uploaded")
}

async fn analyze_raw(State(state): State<ApiState>, body: String) -> ApiResult {
    info!(bytes = body.len(), "Received raw CSV for analysis");
    analysis_response(&state, &body)
}

async fn load_sample(State(state): State<ApiState>) -> ApiResult {
    match tokio::fs::read_to_string(state.sample_data_path.as_path()).await {
        Ok(csv) => analysis_response(&state, &csv),
        Err(e) => {
            error!(path = %state.sample_data_path.display(), "Error loading sample data: {}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error loading sample data: {}", e),
            )
        }
    }
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected chat request body: {}", rejection.body_text());
            return reject(
                rejection.status(),
                format!("Invalid chat request: {}", rejection.body_text()),
            );
        }
    };

    if !state.advisor.is_available() {
        return reject(
            StatusCode::SERVICE_UNAVAILABLE,
            "Financial assistant feature unavailable: GEMINI_API_KEY is not configured",
        );
    }

    let summary = match (req.summary, req.csv) {
        (Some(summary), _) => summary,
        (None, Some(csv)) => match pipeline::summarize_csv(&csv) {
            Ok(summary) => summary,
            Err(e) => return error_response(&e),
        },
        (None, None) => {
            return reject(
                StatusCode::BAD_REQUEST,
                "No data available. Please upload a CSV file first.",
            )
        }
    };

    info!(months = summary.month_count, "Received chat question");

    match state.advisor.advise(&summary, &req.question).await {
        Ok(advice) => (StatusCode::OK, Json(ApiResponse::success(advice))),
        Err(e) => error_response(&e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/analyze", post(analyze_raw))
        .route("/api/sample", get(load_sample))
        .route("/api/chat", post(chat))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(config: AppConfig) -> crate::Result<()> {
    let state = ApiState::from_config(&config)?;
    let router = create_router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", config.port);
    info!("Local: http://127.0.0.1:{}", config.port);

    axum::serve(listener, router).await?;

    Ok(())
}
