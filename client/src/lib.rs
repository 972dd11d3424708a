//! Client for the blog API: an auth session state machine, token storage,
//! form validation and a navigation guard.

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod routes;
pub mod session;
pub mod storage;

pub use api::{BlogApi, HttpApi};
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{AuthState, Session};
