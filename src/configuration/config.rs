use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::types::{Endpoint, RelayConfig};
use crate::error_handling::types::ConfigError;

/// Command-line interface of the `wirecap` binary.
///
/// # Examples
///
/// ```text
/// wirecap capture --scenario login --listen-port 3307 --target-port 3306
/// wirecap extract --scenario login --run-id 20260101-120000-4242
/// ```
#[derive(Parser, Debug, Clone)]
#[command(name = "wirecap")]
#[command(version)]
#[command(about = "Capture one MariaDB/MySQL TCP session and turn it into packet fixtures")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Relay one client connection to the target and record every forwarded chunk
    Capture(CaptureArgs),
    /// Rebuild both directions of a capture and decode them into packets
    Extract(ExtractArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Scenario name (folder under the output root)
    #[arg(long)]
    pub scenario: String,

    #[arg(long, default_value = "127.0.0.1")]
    pub listen_host: String,

    #[arg(long)]
    pub listen_port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    pub target_host: String,

    #[arg(long)]
    pub target_port: u16,

    /// Root directory for capture runs
    #[arg(long, env = "WIRECAP_OUTPUT_ROOT", default_value = "tests/fixtures/scenarios/bin")]
    pub output_root: PathBuf,

    /// Optional TOML file with relay tuning (buffer_size, poll_interval_ms, connect_timeout_secs)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CaptureArgs {
    pub fn listen(&self) -> Endpoint {
        Endpoint::new(&self.listen_host, self.listen_port)
    }

    pub fn target(&self) -> Endpoint {
        Endpoint::new(&self.target_host, self.target_port)
    }

    /// Loads the relay config file if one was given, otherwise the defaults.
    pub fn relay_config(&self) -> Result<RelayConfig, ConfigError> {
        match &self.config {
            Some(path) => RelayConfig::from_file(path),
            None => Ok(RelayConfig::default()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub scenario: String,

    #[arg(long)]
    pub run_id: String,

    /// Capture root
    #[arg(long, env = "WIRECAP_SCENARIOS_ROOT", default_value = "tests/fixtures/scenarios/bin")]
    pub scenarios_root: PathBuf,

    /// Packetized output root
    #[arg(long, env = "WIRECAP_PACKETIZED_ROOT", default_value = "tests/fixtures/packetized")]
    pub output_root: PathBuf,
}

impl ExtractArgs {
    pub fn run_dir(&self) -> PathBuf {
        self.scenarios_root.join(&self.scenario).join(&self.run_id)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.output_root.join(&self.scenario).join(&self.run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_args() {
        let cli = Cli::try_parse_from([
            "wirecap",
            "capture",
            "--scenario",
            "login",
            "--listen-port",
            "3307",
            "--target-port",
            "3306",
            "--output-root",
            "/tmp/caps",
        ])
        .unwrap_or_else(|e| panic!("{}", e));

        let Command::Capture(args) = cli.command else {
            panic!("expected capture subcommand");
        };
        assert_eq!(args.scenario, "login");
        assert_eq!(args.listen(), Endpoint::new("127.0.0.1", 3307));
        assert_eq!(args.target(), Endpoint::new("127.0.0.1", 3306));
        assert_eq!(args.output_root, PathBuf::from("/tmp/caps"));
        assert_eq!(args.relay_config().unwrap(), RelayConfig::default());
    }

    #[test]
    fn test_capture_requires_ports() {
        assert!(Cli::try_parse_from(["wirecap", "capture", "--scenario", "x"]).is_err());
    }

    #[test]
    fn test_extract_paths() {
        let cli = Cli::try_parse_from([
            "wirecap",
            "extract",
            "--scenario",
            "login",
            "--run-id",
            "r1",
            "--scenarios-root",
            "/data/bin",
            "--output-root",
            "/data/packetized",
        ])
        .unwrap_or_else(|e| panic!("{}", e));

        let Command::Extract(args) = cli.command else {
            panic!("expected extract subcommand");
        };
        assert_eq!(args.run_dir(), PathBuf::from("/data/bin/login/r1"));
        assert_eq!(args.out_dir(), PathBuf::from("/data/packetized/login/r1"));
    }
}
