use axum::{extract::State, http::Uri, response::Html};
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::views::templates::{Context, Templates};

pub const HOME_TEMPLATE: &str = "home.html";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub templates: Templates,
}

pub async fn home(State(state): State<Arc<AppState>>, uri: Uri) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    context.insert("path".to_string(), uri.path().to_string());
    context.insert("static_url".to_string(), state.config.static_url.clone());

    let body = state.templates.render(HOME_TEMPLATE, &context).await?;
    Ok(Html(body))
}

/// Fails on every request; used to exercise the error pages.
pub async fn error() -> Result<Html<String>, AppError> {
    Err(AppError::Runtime("Error".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_view_always_fails() {
        for _ in 0..3 {
            let err = error().await.unwrap_err();
            assert_eq!(err.kind(), "RuntimeError");
            assert_eq!(err.to_string(), "Error");
        }
    }
}
