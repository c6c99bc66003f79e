use std::io::ErrorKind;
use std::path::Path;

use axum::{extract::State, response::Html};

use crate::error::AppError;
use crate::AppState;

pub async fn terms(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    serve_page(&state.config.legal_pages_dir, "terms.html").await
}

pub async fn privacy(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    serve_page(&state.config.legal_pages_dir, "privacy.html").await
}

/// 404 when the page is missing, 500 on any other read failure.
async fn serve_page(dir: &Path, file: &str) -> Result<Html<String>, AppError> {
    match tokio::fs::read_to_string(dir.join(file)).await {
        Ok(body) => Ok(Html(body)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::NotFound),
        Err(e) => Err(AppError::Internal(format!("Failed to read {file}: {e}"))),
    }
}
