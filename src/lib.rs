#![doc = include_str!("../README.md")]

pub mod broker;
pub mod discovery;
pub mod error;
pub mod middleware;
pub mod oauth;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use broker::{BrokerError, SessionBroker};
pub use discovery::{DiscoveryDocument, fetch_discovery};
pub use error::Error;
pub use oauth::{AuthClient, OAuthConfig, TokenResponse, UserInfo};
pub use store::{MemoryTokenStore, StoreError, TokenStore};
pub use types::{SessionId, TokenPair};
