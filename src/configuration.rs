pub mod config;
pub mod types;

pub use config::{CaptureArgs, Cli, Command, ExtractArgs};
pub use types::{Endpoint, RelayConfig};
