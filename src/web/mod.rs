pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::{json_error_handler, AppState};
