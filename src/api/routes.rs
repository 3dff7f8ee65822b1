use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::api::response;
use crate::error::AppError;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/summarize", post(summarize_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(INDEX_HTML.replace("{{model}}", &escape_html(&state.config.gemini_model)))
}

async fn summarize_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection);
            return AppError::InvalidInput("有効なURLを入力してください".into()).into_response();
        }
    };

    let start_time = std::time::Instant::now();
    let result = state.pipeline.run(&body).await;
    let elapsed_ms = start_time.elapsed().as_millis() as u64;

    match result {
        Ok(summary) => {
            tracing::info!(url = %summary.source_url, elapsed_ms, "Summarize request succeeded");
            response::success(summary).into_response()
        }
        Err(err) => {
            tracing::info!(category = err.category().as_str(), elapsed_ms, "Summarize request failed");
            err.into_response()
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
