use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::diagnostics::{
    DiagnosticHandler, ForwardToDebugger, TechnicalResponse, debugged_application, log_unhandled,
    panic_response, technical_response,
};
use crate::views::{self, AppState, Templates};

/// Log target shared by the application and the debugger layer.
pub const LOG_TARGET: &str = module_path!();

/// Composes the application with the default diagnostics: local requests
/// are forwarded to the debugger, everyone else gets the technical page.
pub fn application(config: &Config) -> Router {
    let diagnostics = Arc::new(ForwardToDebugger {
        fallback: Arc::new(TechnicalResponse {
            settings_module: config.settings_module.clone(),
        }),
    });
    application_with(config, diagnostics)
}

pub fn application_with(config: &Config, diagnostics: Arc<dyn DiagnosticHandler>) -> Router {
    let state = Arc::new(AppState {
        config: config.clone(),
        templates: Templates::new(config.template_dir.clone()),
    });

    let views = Router::new()
        .route("/", get(views::home))
        .route("/error", get(views::error))
        .with_state(state);

    compose(config, diagnostics, views)
}

/// Wraps `views` in the error handling, static file and tracing layers.
fn compose(config: &Config, diagnostics: Arc<dyn DiagnosticHandler>, views: Router) -> Router {
    let mut app = views.layer(CatchPanicLayer::custom(panic_response));

    if config.debug {
        app = app.layer(middleware::from_fn_with_state(diagnostics, technical_response));
    }

    // Static files bypass the error hook but not the debugger.
    app = app.nest_service(&config.static_url, ServeDir::new(&config.static_dir));

    app = if config.debug {
        app.layer(middleware::from_fn(debugged_application))
    } else {
        app.layer(middleware::from_fn(log_unhandled))
    };

    app.layer(TraceLayer::new_for_http())
}
