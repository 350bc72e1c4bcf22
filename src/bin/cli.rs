use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use mcast_inspector::config::{MonitorConfig, parse_interval};
use mcast_inspector::constants::{DEFAULT_COMMAND_TIMEOUT_SECS, KEY_PASSPHRASE_ENV, PASSWORD_ENV};
use mcast_inspector::monitor::{Options, run};
use mcast_inspector::report::ReportFormat;
use mcast_inspector::stop_channel;
use mcast_inspector::transport::{CaptureTransport, SshTransport};
use mcast_inspector::types::Vendor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[clap(about = "Multicast health checks for Cisco and Netgear switches")]
struct Opt {
    /// Switch hostname or IP address
    #[clap(long)]
    host: Option<String>,

    /// Switch vendor: cisco | netgear
    #[clap(long)]
    vendor: Option<String>,

    /// Seconds between polls; 0 runs a single check
    #[clap(long, default_value = "0")]
    interval: String,

    /// SSH login user; the password is read from MCAST_INSPECTOR_PASSWORD
    #[clap(long)]
    user: Option<String>,

    /// SSH port (default 22)
    #[clap(long)]
    port: Option<u16>,

    /// SSH private key file; its passphrase is read from MCAST_INSPECTOR_KEY_PASSPHRASE
    #[clap(long)]
    key: Option<PathBuf>,

    /// Pin the switch host key to this SHA256 fingerprint
    #[clap(long)]
    host_key: Option<String>,

    /// Per-command timeout in seconds
    #[clap(long, default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS)]
    timeout: u64,

    /// Read command output from captured files instead of SSH
    #[clap(long)]
    capture_dir: Option<PathBuf>,

    /// JSON config file; replaces --host/--vendor/--interval/--timeout (SSH flags still override it)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Emit one JSON document per cycle
    #[clap(long, default_value_t = false)]
    json: bool,
}

impl Opt {
    fn monitor_config(&self) -> anyhow::Result<MonitorConfig> {
        if let Some(path) = &self.config {
            return MonitorConfig::from_json_file(path).with_context(|| format!("loading {}", path.display()));
        }
        let (Some(host), Some(vendor)) = (&self.host, &self.vendor) else {
            bail!("--host and --vendor are required unless --config is given");
        };
        let vendor: Vendor = vendor.parse()?;
        let mut config = MonitorConfig::new(host.trim(), vendor, parse_interval(&self.interval)?);
        config.command_timeout_secs = self.timeout;
        config.validate()?;
        Ok(config)
    }

    fn ssh_transport(&self, config: &MonitorConfig) -> anyhow::Result<SshTransport> {
        let mut settings = config.ssh.clone();
        settings.username = self.user.clone().or(settings.username);
        settings.port = self.port.or(settings.port);
        settings.key_file = self.key.clone().or(settings.key_file);
        settings.host_key = self.host_key.clone().or(settings.host_key);
        let transport = SshTransport::from_settings(
            &settings,
            std::env::var(PASSWORD_ENV).ok(),
            std::env::var(KEY_PASSPHRASE_ENV).ok(),
        )?;
        Ok(transport)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    // logs go to stderr so stdout stays a clean report stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcast_inspector=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = opt.monitor_config()?;
    let options = Options {
        config,
        format: if opt.json { ReportFormat::Json } else { ReportFormat::Text },
    };

    let (stop, stop_rx) = stop_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after the current cycle");
            let _ = stop.send(true);
        }
    });

    let summary = match &opt.capture_dir {
        Some(dir) => run(options, CaptureTransport::new(dir), stop_rx).await?,
        None => {
            let transport = opt.ssh_transport(&options.config)?;
            run(options, transport, stop_rx).await?
        }
    };
    tracing::debug!(cycles = summary.cycles, "done");
    Ok(())
}
