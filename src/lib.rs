pub mod classifier;
pub mod config;
pub mod error;
pub mod intake;
pub mod presenter;
pub mod retry;
pub mod session;
pub mod workflow;

pub use classifier::{Classification, ClassifierClient, Label};
pub use config::AppConfig;
pub use error::{ClassifyError, ConfigError, SessionError};
pub use workflow::{ClassifierWorkflow, UploadState};

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// `info` default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
