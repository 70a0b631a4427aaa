//! Session Cookie Gateway: the only code that touches the HTTP transport for
//! session identity.
//!
//! Mounts four routes on an axum [`Router`](axum::Router) — exchange, me,
//! refresh, logout — and owns the session cookie. No code path here ever
//! serializes an access or refresh token into a response body, header, or
//! redirect URL; the browser only ever sees the opaque session id.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use profolio_bff::middleware::{BffAuthConfig, auth_routes};
//! use profolio_bff::MemoryTokenStore;
//!
//! let config = BffAuthConfig::from_env()?;
//! let app = axum::Router::new()
//!     .merge(auth_routes(config, Arc::new(MemoryTokenStore::new())));
//! ```

mod config;
mod cookies;
mod error;
mod routes;
mod state;
mod types;

pub use config::BffAuthConfig;
pub use error::AuthError;
pub use routes::auth_routes;
pub use types::ApiResponse;
