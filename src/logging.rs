use tracing_subscriber::{EnvFilter, filter::Directive};

use crate::app::LOG_TARGET;

const DEFAULT_FILTER: &str = "sample_web=info,tower_http=info";

/// Filter from `RUST_LOG`, or the default when unset.
pub fn env_filter() -> anyhow::Result<EnvFilter> {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    with_debugger_directive(base)
}

/// Debugger records land on the application target, always at INFO.
pub fn with_debugger_directive(base: EnvFilter) -> anyhow::Result<EnvFilter> {
    let directive: Directive = format!("{}=info", LOG_TARGET).parse()?;
    Ok(base.add_directive(directive))
}
