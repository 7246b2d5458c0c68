//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ErrorResponse, EvaluatePayload, EvaluateResponse, Interview, Question,
        StartInterviewPayload, Topic,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::start_interview,
        handlers::get_question,
        handlers::evaluate_interview,
        handlers::interview_history,
    ),
    components(
        schemas(Interview, Topic, Question, StartInterviewPayload, EvaluatePayload, EvaluateResponse, ErrorResponse)
    ),
    tags(
        (name = "Intervu API", description = "Mock-interview sessions with AI question generation and evaluation")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/api/interviews/start", post(handlers::start_interview))
        .route("/api/interviews/question", get(handlers::get_question))
        .route("/api/interviews/evaluate", post(handlers::evaluate_interview))
        .route("/api/interviews/history", get(handlers::interview_history))
        .route("/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Merge the stateful routes with the stateless ones (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
