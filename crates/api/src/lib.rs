//! HTTP API for cached dashboards and on-demand refresh.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
