pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod sweeper;

pub use error::ApiError;
pub use server::{build_router, run_server, serve};
pub use state::AppState;
