use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method, StatusCode, Uri, Version, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use maud::{DOCTYPE, html};
use std::fmt::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::app::LOG_TARGET;
use crate::error::{AppError, Failure, unhandled_response};

/// What the error pages need to know about the request that failed.
#[derive(Clone, Debug)]
pub struct RequestMeta {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

impl RequestMeta {
    pub fn from_request<B>(request: &axum::http::Request<B>) -> Self {
        RequestMeta {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
            remote_addr: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        }
    }

    /// True only for 127.0.0.1, including its IPv4-mapped IPv6 form.
    pub fn is_loopback(&self) -> bool {
        matches!(
            self.remote_addr.map(|addr| addr.ip().to_canonical()),
            Some(IpAddr::V4(ip)) if ip == Ipv4Addr::LOCALHOST
        )
    }

    fn remote_display(&self) -> String {
        self.remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Decides how an unhandled error is presented. `Err` hands the error back
/// unchanged so an outer layer can deal with it.
pub trait DiagnosticHandler: Send + Sync {
    fn respond(
        &self,
        request: &RequestMeta,
        error: Arc<AppError>,
    ) -> Result<Response, Arc<AppError>>;
}

/// Always renders the technical 500 page.
#[derive(Clone, Debug)]
pub struct TechnicalResponse {
    pub settings_module: String,
}

impl DiagnosticHandler for TechnicalResponse {
    fn respond(
        &self,
        request: &RequestMeta,
        error: Arc<AppError>,
    ) -> Result<Response, Arc<AppError>> {
        Ok(technical_500_response(request, &error, &self.settings_module))
    }
}

/// Re-raises errors from local requests so the debugger can show them;
/// template syntax errors and remote requests go to `fallback`.
#[derive(Clone)]
pub struct ForwardToDebugger {
    pub fallback: Arc<dyn DiagnosticHandler>,
}

impl DiagnosticHandler for ForwardToDebugger {
    fn respond(
        &self,
        request: &RequestMeta,
        error: Arc<AppError>,
    ) -> Result<Response, Arc<AppError>> {
        if request.is_loopback() && !error.is_template_syntax() {
            return Err(error);
        }
        self.fallback.respond(request, error)
    }
}

pub fn technical_500_response(
    request: &RequestMeta,
    error: &AppError,
    settings_module: &str,
) -> Response {
    if accepts_html(&request.headers) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(technical_html(request, error, settings_module)),
        )
            .into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            technical_text(request, error, settings_module),
        )
            .into_response()
    }
}

fn accepts_html(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return true;
    };
    accept.split(',').any(|media| {
        let media = media.split(';').next().unwrap_or("").trim();
        media == "text/html" || media == "text/*" || media == "*/*"
    })
}

fn technical_html(request: &RequestMeta, error: &AppError, settings_module: &str) -> String {
    let title = format!("{} at {}", error.kind(), request.uri.path());
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="robots" content="NONE,NOARCHIVE";
                title { (title) }
            }
            body {
                div #summary {
                    h1 { (title) }
                    pre .exception_value { (error.to_string()) }
                    table .meta {
                        tr { th { "Request Method:" } td { (request.method.as_str()) } }
                        tr { th { "Request URL:" } td { (request.uri.to_string()) } }
                        tr { th { "Exception Type:" } td { (error.kind()) } }
                        tr { th { "Exception Value:" } td { pre { (error.to_string()) } } }
                        tr { th { "Remote Address:" } td { (request.remote_display()) } }
                        tr { th { "Settings Module:" } td { (settings_module) } }
                        tr { th { "Server time:" } td { (Utc::now().to_rfc2822()) } }
                    }
                }
                @let chain = error.source_chain();
                @if !chain.is_empty() {
                    div #traceback {
                        h2 { "Caused by" }
                        ol {
                            @for cause in &chain {
                                li { code { (cause) } }
                            }
                        }
                    }
                }
                div #requestinfo {
                    h2 { "Request information" }
                    table .req {
                        thead { tr { th { "Header" } th { "Value" } } }
                        tbody {
                            @for (name, value) in &request.headers {
                                tr {
                                    td { (name.as_str()) }
                                    td { pre { (value.to_str().unwrap_or("<non-ascii>")) } }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    .into_string()
}

fn technical_text(request: &RequestMeta, error: &AppError, settings_module: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} at {}", error.kind(), request.uri.path());
    let _ = writeln!(out, "{}", error);
    let _ = writeln!(out);
    let _ = writeln!(out, "Request Method: {}", request.method);
    let _ = writeln!(out, "Request URL: {}", request.uri);
    let _ = writeln!(out, "Remote Address: {}", request.remote_display());
    let _ = writeln!(out, "Settings Module: {}", settings_module);
    let _ = writeln!(out, "Server time: {}", Utc::now().to_rfc2822());
    for cause in error.source_chain() {
        let _ = writeln!(out, "Caused by: {}", cause);
    }
    out
}

/// Routes unhandled errors from the inner service through the configured
/// [`DiagnosticHandler`].
pub async fn technical_response(
    State(handler): State<Arc<dyn DiagnosticHandler>>,
    request: Request,
    next: Next,
) -> Response {
    let meta = RequestMeta::from_request(&request);
    let mut response = next.run(request).await;

    let Some(Failure(error)) = response.extensions_mut().remove::<Failure>() else {
        return response;
    };

    match handler.respond(&meta, error.clone()) {
        Ok(rendered) => {
            tracing::error!(
                target: LOG_TARGET,
                method = %meta.method,
                path = %meta.uri.path(),
                kind = error.kind(),
                error = %error,
                "Internal Server Error"
            );
            rendered
        }
        Err(error) => {
            tracing::debug!(
                method = %meta.method,
                path = %meta.uri.path(),
                kind = error.kind(),
                "Re-raising error to the debugger"
            );
            unhandled_response(error)
        }
    }
}
