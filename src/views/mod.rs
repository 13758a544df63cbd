pub mod handlers;
pub mod templates;

pub use handlers::{AppState, error, home};
pub use templates::Templates;
