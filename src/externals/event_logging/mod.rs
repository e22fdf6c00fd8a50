use std::sync::Arc;

use self::adapters::EmitToLoggingAdapter;

pub mod adapters;

pub struct EventLoggingModule {
    pub host_adapter: Arc<EmitToLoggingAdapter>,
}

impl EventLoggingModule {
    pub fn initialize() -> Self {
        Self {
            host_adapter: Arc::new(EmitToLoggingAdapter::default()),
        }
    }
}
