use std::sync::Arc;

use rh_domain::config::Config;

use crate::dispatch::Dispatcher;

/// Shared application state passed to all API handlers.
///
/// Holds no per-session data: everything a turn needs arrives in the
/// envelope.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
}
