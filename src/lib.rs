pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod relay;
pub mod voice;
