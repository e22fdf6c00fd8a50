pub mod discovery;
pub mod event_logging;
pub mod hardware;
pub mod host;
