pub mod debugger;
pub mod technical;

pub use debugger::{debugged_application, log_unhandled, panic_response};
pub use technical::{DiagnosticHandler, ForwardToDebugger, TechnicalResponse, technical_response};
