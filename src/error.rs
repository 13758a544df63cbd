use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid template syntax in {template} (line {line}): {message}")]
    TemplateSyntax {
        template: String,
        line: usize,
        message: String,
    },

    #[error("Template does not exist: {0}")]
    TemplateNotFound(String),

    #[error("{0}")]
    Runtime(String),

    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stable name of the error kind, shown on diagnostic pages.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::TemplateSyntax { .. } => "TemplateSyntaxError",
            AppError::TemplateNotFound(_) => "TemplateDoesNotExist",
            AppError::Runtime(_) => "RuntimeError",
            AppError::Panic(_) => "PanicError",
            AppError::Io(_) => "IOError",
        }
    }

    pub fn is_template_syntax(&self) -> bool {
        matches!(self, AppError::TemplateSyntax { .. })
    }

    /// Messages of the underlying causes, outermost first.
    pub fn source_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}

/// Marks a response as produced from an unhandled error. Outer layers look
/// for it to decide how the error is finally presented.
#[derive(Clone, Debug)]
pub struct Failure(pub Arc<AppError>);

/// Bare 500 carrying the error along for the outer layers.
pub fn unhandled_response(error: Arc<AppError>) -> Response {
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    response.extensions_mut().insert(Failure(error));
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::debug!("Unhandled error: {}", self);
        unhandled_response(Arc::new(self))
    }
}
