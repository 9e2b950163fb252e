pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod dispatch;
pub mod runtime;
pub mod session;
pub mod state;
