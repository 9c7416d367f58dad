use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use assetdesk::actions::Actions;
use assetdesk::config::DeskConfig;
use assetdesk::manager::{self, RuntimeProfile};
use assetdesk::{server, AssetDesk};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// JSON config file. Flags below override its values.
    #[clap(long)]
    config: Option<PathBuf>,

    #[clap(long)]
    bind: Option<String>,

    /// Fixture loaded when no snapshot exists.
    #[clap(long)]
    fixture: Option<PathBuf>,

    #[clap(long)]
    snapshot: Option<PathBuf>,

    #[clap(long)]
    delay_ms: Option<u64>,

    #[clap(long)]
    timeout_ms: Option<u64>,

    #[clap(long)]
    autosave_secs: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<DeskConfig, String> {
        let mut config = match &self.config {
            Some(path) => DeskConfig::load(path).map_err(|e| e.to_string())?,
            None => DeskConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(fixture) = self.fixture {
            config.fixture = Some(fixture);
        }
        if let Some(snapshot) = self.snapshot {
            config.snapshot = Some(snapshot);
        }
        if let Some(ms) = self.delay_ms {
            config.action_delay_ms = ms;
        }
        if let Some(ms) = self.timeout_ms {
            config.action_timeout_ms = ms;
        }
        if let Some(secs) = self.autosave_secs {
            config.autosave_secs = secs;
        }
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,assetdesk=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "bad configuration");
            return ExitCode::FAILURE;
        }
    };

    let profile = RuntimeProfile::detect();
    info!(
        cores = profile.logical_cores,
        workers = profile.worker_threads,
        delay_ms = config.action_delay_ms,
        timeout_ms = config.action_timeout_ms,
        "starting assetdesk"
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(profile.worker_threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "assetdesk stopped");
            ExitCode::FAILURE
        }
    }
}

fn open_desk(config: &DeskConfig) -> Result<AssetDesk, String> {
    if let Some(snapshot) = config.snapshot.as_deref().filter(|p| p.exists()) {
        return AssetDesk::load(snapshot).map_err(|e| format!("snapshot {}: {e}", snapshot.display()));
    }
    if let Some(fixture) = &config.fixture {
        return AssetDesk::load(fixture).map_err(|e| format!("fixture {}: {e}", fixture.display()));
    }
    warn!("no fixture or snapshot configured, starting empty");
    Ok(AssetDesk::new())
}

async fn async_main(config: DeskConfig) -> Result<(), String> {
    let addr: SocketAddr = config
        .bind
        .parse()
        .map_err(|e| format!("invalid bind address {:?}: {e}", config.bind))?;

    let desk = Arc::new(open_desk(&config)?);

    let autosave = match (config.snapshot.clone(), config.autosave_secs > 0) {
        (Some(path), true) => Some(manager::start_autosave_thread(
            desk.clone(),
            path,
            Duration::from_secs(config.autosave_secs),
        )),
        _ => None,
    };

    let actions = Actions::new(desk.clone(), &config);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
        info!("shutting down");
    };

    let served = server::serve(actions, addr, shutdown).await.map_err(|e| e.to_string());

    if let Some(autosave) = autosave {
        if let Err(e) = tokio::task::spawn_blocking(move || autosave.stop()).await {
            error!(error = %e, "autosave shutdown failed");
        }
    }
    served?;

    if let Some(path) = &config.snapshot {
        desk.save(path).map_err(|e| format!("final save to {}: {e}", path.display()))?;
        info!(path = %path.display(), "snapshot written");
    }
    Ok(())
}
