use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use maud::{DOCTYPE, html};
use std::any::Any;

use crate::app::LOG_TARGET;
use crate::diagnostics::technical::RequestMeta;
use crate::error::{AppError, Failure};

/// Outermost layer: whatever error is still unhandled here gets logged and
/// shown as a traceback page.
pub async fn debugged_application(request: Request, next: Next) -> Response {
    let meta = RequestMeta::from_request(&request);
    let mut response = next.run(request).await;

    let Some(Failure(error)) = response.extensions_mut().remove::<Failure>() else {
        return response;
    };

    tracing::error!(
        target: LOG_TARGET,
        method = %meta.method,
        path = %meta.uri.path(),
        kind = error.kind(),
        error = %error,
        "Error on request"
    );

    (StatusCode::INTERNAL_SERVER_ERROR, Html(traceback_page(&meta, &error))).into_response()
}

/// Used instead of the debugger when debug is off, so unhandled errors are
/// still reported once on the application target.
pub async fn log_unhandled(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    if let Some(Failure(error)) = response.extensions().get::<Failure>() {
        tracing::error!(
            target: LOG_TARGET,
            method = %method,
            path = %path,
            kind = error.kind(),
            error = %error,
            "Internal Server Error"
        );
    }
    response
}

fn traceback_page(request: &RequestMeta, error: &AppError) -> String {
    let headline = format!("{}: {}", error.kind(), error);
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (headline) " // Debugger" }
            }
            body .debugger {
                h1 { (error.kind()) }
                div .detail { p .errormsg { (headline) } }
                h2 .traceback { "Traceback " em { "(most recent call last)" } }
                div .traceback {
                    ul {
                        li {
                            code {
                                (request.method.as_str()) " " (request.uri.to_string())
                                " " (format!("{:?}", request.version))
                            }
                        }
                        @for cause in error.source_chain() {
                            li { code { (cause) } }
                        }
                    }
                    blockquote { (headline) }
                }
                div .explanation {
                    "The debugger caught an exception in your application. "
                    "The error was re-raised by the request handler instead of being rendered."
                }
            }
        }
    }
    .into_string()
}

/// Turns a handler panic into an unhandled error so it follows the same
/// path as any other failure.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::Panic(message).into_response()
}
