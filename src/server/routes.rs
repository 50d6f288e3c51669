//! HTTP route handlers for the art sparker API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::backend::Challenge;
use crate::prompt::{FragmentKind, PromptFragments};
use crate::quota::{ActionOutcome, QuotaSnapshot};

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/quota", get(quota))
        .route("/api/quota/bonus", post(rewarded_bonus))
        .route(
            "/api/prompt",
            get(current_prompt).post(generate_prompt).delete(clear_prompt),
        )
        .route("/api/prompt/{fragment}", post(change_fragment))
        .route("/api/image", post(generate_image))
        .route("/api/challenge", get(challenge))
        .route("/api/session", delete(clear_session))
        .route(
            "/api/preferences/dark-mode",
            get(dark_mode).put(save_dark_mode),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "art-sparker",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Body of every quota-gated action.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    /// True when the action was refused by the daily limit.
    pub limit_reached: bool,
    /// What happened.
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

fn action_response(outcome: ActionOutcome) -> (StatusCode, Json<ActionResponse>) {
    let limit_reached = outcome.is_blocked();
    let status = if limit_reached {
        StatusCode::TOO_MANY_REQUESTS
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(ActionResponse {
            limit_reached,
            outcome,
        }),
    )
}

async fn quota(State(state): State<Arc<AppState>>) -> Json<QuotaSnapshot> {
    Json(state.controller.snapshot().await)
}

async fn rewarded_bonus(State(state): State<Arc<AppState>>) -> Json<QuotaSnapshot> {
    Json(state.controller.watch_rewarded_ad().await)
}

async fn generate_prompt(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    action_response(state.controller.generate_prompt().await)
}

async fn change_fragment(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<FragmentKind>,
) -> impl IntoResponse {
    action_response(state.controller.change_fragment(kind).await)
}

/// Current prompt state.
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    /// Full sentence, when all fragments are set.
    pub prompt: Option<String>,
    /// Current fragments.
    pub fragments: PromptFragments,
    /// Last rendered image.
    pub image_url: Option<String>,
}

async fn current_prompt(State(state): State<Arc<AppState>>) -> Json<PromptResponse> {
    Json(PromptResponse {
        prompt: state.controller.current_prompt().await,
        fragments: state.controller.fragments().await,
        image_url: state.controller.current_image().await,
    })
}

async fn clear_prompt(State(state): State<Arc<AppState>>) -> StatusCode {
    state.controller.clear_prompt().await;
    StatusCode::NO_CONTENT
}

/// Image rendering request.
#[derive(Debug, Default, Deserialize)]
pub struct ImageRequestBody {
    /// Prompt to render; the current prompt when absent.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Image rendering result.
#[derive(Debug, Serialize)]
pub struct ImageResponse {
    /// Image URL, absent when rendering failed.
    pub image_url: Option<String>,
}

async fn generate_image(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ImageRequestBody>>,
) -> Json<ImageResponse> {
    let prompt = body.and_then(|Json(request)| request.prompt);
    let image_url = state.controller.generate_image(prompt.as_deref()).await;
    Json(ImageResponse { image_url })
}

async fn challenge(State(state): State<Arc<AppState>>) -> Json<Challenge> {
    let challenge = match &state.backend {
        Some(backend) => backend.active_challenge().await,
        None => Challenge::placeholder(Utc::now()),
    };
    Json(challenge)
}

async fn clear_session(State(state): State<Arc<AppState>>) -> StatusCode {
    state.sessions.clear_session().await;
    StatusCode::NO_CONTENT
}

/// Dark mode preference; `null` follows the system default.
#[derive(Debug, Serialize, Deserialize)]
pub struct DarkModeBody {
    /// Stored flag.
    pub dark_mode: Option<bool>,
}

async fn dark_mode(State(state): State<Arc<AppState>>) -> Json<DarkModeBody> {
    Json(DarkModeBody {
        dark_mode: state.preferences.dark_mode().await,
    })
}

async fn save_dark_mode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DarkModeBody>,
) -> Result<Json<DarkModeBody>, (StatusCode, String)> {
    let enabled = body
        .dark_mode
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "dark_mode must be true or false".to_string()))?;
    state.preferences.save_dark_mode(enabled).await;
    Ok(Json(DarkModeBody {
        dark_mode: Some(enabled),
    }))
}
