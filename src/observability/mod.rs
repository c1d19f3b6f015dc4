pub mod logging;
pub mod metrics;

pub use logging::{init_logging, ComponentLogger, LogConfig, LogFormat};
pub use metrics::install_prometheus_recorder;
