use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use uuid::Uuid;
use wirecap::configuration::{CaptureArgs, Cli, Command, ExtractArgs};
use wirecap::data_capture::{CaptureRelay, SessionRecorder};
use wirecap::export::{export_run, ExportRequest};
use wirecap::storage::file_storage::FileChunkStore;
use wirecap::storage::types::{CaptureManifest, SessionStatus};

const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Capture(args) => capture(args).await,
        Command::Extract(args) => extract(args),
    }
}

async fn capture(args: CaptureArgs) -> ExitCode {
    let config = match args.relay_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to load relay configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (store, run_id) = match FileChunkStore::create_run(&args.output_root, &args.scenario) {
        Ok(created) => created,
        Err(e) => {
            error!("Unable to create run directory: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let session_id = Uuid::new_v4();
    let manifest = CaptureManifest::new(&args.scenario, &run_id, session_id, args.listen(), args.target());
    if let Err(e) = store.write_manifest(&manifest) {
        error!("Unable to write manifest: {}", e);
        return ExitCode::FAILURE;
    }
    info!("output: {}", store.run_dir().display());

    let mut relay = match CaptureRelay::bind(&args.listen(), args.target(), config).await {
        Ok(relay) => relay,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let recorder = SessionRecorder::new(session_id, Arc::new(store));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for interrupt signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match relay.run(recorder, shutdown).await {
        Ok(summary) if summary.status == SessionStatus::Interrupted => {
            info!("done (interrupted)");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Ok(_) => {
            info!("done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("capture failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn extract(args: ExtractArgs) -> ExitCode {
    let run_dir = args.run_dir();
    if !run_dir.exists() {
        error!("missing run dir: {}", run_dir.display());
        return ExitCode::from(2);
    }
    let store = FileChunkStore::open(&run_dir);
    if !store.events_path().exists() {
        error!("missing events file: {}", store.events_path().display());
        return ExitCode::from(2);
    }

    let request = ExportRequest {
        scenario: args.scenario.clone(),
        run_id: args.run_id.clone(),
        source_run_dir: run_dir,
        out_dir: args.out_dir(),
    };
    match export_run(&store, &request) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("extract failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
