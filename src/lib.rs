pub mod config;
pub mod drive;
pub mod error;
pub mod logging;
pub mod oauth;
pub mod report;
pub mod runner;
pub mod transport;

pub use config::{load_config, DriveupConfig};
pub use drive::{DriveClient, UploadOutcome};
pub use error::DriveupError;
pub use oauth::{TokenLifecycleManager, TokenRecord};
pub use report::ReportLocator;
pub use runner::Runner;
pub use transport::{FormTransport, HttpReply, ReqwestTransport};

