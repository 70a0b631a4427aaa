use std::sync::Arc;

use super::config::GatewaySettings;
use crate::broker::SessionBroker;

/// Shared state for the gateway route handlers.
#[derive(Clone)]
pub(super) struct GatewayState {
    pub(super) broker: Arc<SessionBroker>,
    pub(super) settings: GatewaySettings,
}
