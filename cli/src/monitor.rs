//! scope-monitor: keeps the shared scope snapshot in sync with the scoped
//! config objects in one namespace.
//!
//! # Usage
//!
//! ```text
//! scope-monitor --namespace ratify
//! scope-monitor --config /etc/scope-gate/monitor.yaml --once
//! scope-monitor --store-dir ./configmaps --shared-dir ./shared --once
//! ```

mod logging;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use scope_gate_core::daemon::{Daemon, DaemonConfig};
use scope_gate_core::settings::MonitorSettings;
use scope_gate_core::store::{ConfigStore, DirectoryStore, KubeCredentials, KubectlStore};
use scope_gate_core::{Aggregator, SnapshotStore};

#[derive(Parser, Debug)]
#[command(name = "scope-monitor")]
#[command(version)]
#[command(about = "Merge scoped config objects into the shared scope snapshot")]
struct Cli {
    /// YAML settings file
    #[arg(long, env = "SCOPE_GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Namespace to watch
    #[arg(long, env = "SCOPE_GATE_NAMESPACE")]
    namespace: Option<String>,

    /// Name prefix of the scoped config objects
    #[arg(long)]
    prefix: Option<String>,

    /// Seconds between polls
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Directory the snapshot is published to
    #[arg(long)]
    shared_dir: Option<PathBuf>,

    /// Kubeconfig used by kubectl
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Read config objects from a directory instead of the cluster
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    /// Defaults, then the settings file, then flags.
    fn settings(&self) -> Result<MonitorSettings> {
        let mut settings = match &self.config {
            Some(path) => MonitorSettings::load(path)?,
            None => MonitorSettings::default(),
        };
        if let Some(v) = &self.namespace {
            settings.namespace = v.clone();
        }
        if let Some(v) = &self.prefix {
            settings.prefix = v.clone();
        }
        if let Some(v) = self.interval_secs {
            settings.interval_secs = v;
        }
        if let Some(v) = &self.shared_dir {
            settings.shared_dir = v.clone();
        }
        if let Some(v) = &self.kubeconfig {
            settings.kubeconfig = Some(v.clone());
        }
        if let Some(v) = &self.store_dir {
            settings.store_dir = Some(v.clone());
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn build_store(settings: &MonitorSettings) -> Box<dyn ConfigStore> {
    if let Some(dir) = &settings.store_dir {
        info!(dir = %dir.display(), "reading config objects from directory");
        return Box::new(DirectoryStore::new(dir.clone()));
    }
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let credentials = KubeCredentials::resolve(settings.kubeconfig.as_deref(), home.as_deref());
    Box::new(
        KubectlStore::new(&settings.kubectl, &settings.namespace, credentials)
            .with_request_timeout(&settings.request_timeout),
    )
}

/// The shared directory is created by the first publish.
fn build_daemon(settings: &MonitorSettings) -> Daemon<Box<dyn ConfigStore>> {
    let snapshots = SnapshotStore::new(settings.shared_dir.clone(), &settings.file_name);
    let aggregator = Aggregator::new(build_store(settings), snapshots, &settings.prefix);
    let config = DaemonConfig {
        interval: Duration::from_secs(settings.interval_secs),
    };
    Daemon::new(aggregator, config)
}

fn run(cli: Cli) -> Result<i32> {
    let settings = cli.settings().context("invalid monitor settings")?;
    info!(
        namespace = %settings.namespace,
        prefix = %settings.prefix,
        shared_dir = %settings.shared_dir.display(),
        "starting scope monitor"
    );
    let mut daemon = build_daemon(&settings);

    if cli.once {
        return match daemon.tick() {
            Ok(outcome) => {
                info!(published = outcome.is_published(), "single cycle finished");
                Ok(0)
            }
            Err(e) => {
                error!(error = %e, "single cycle failed");
                Ok(1)
            }
        };
    }
    daemon.run()
}

fn main() {
    logging::init("info");
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("scope-monitor: {:#}", e);
            process::exit(1);
        }
    }
}
