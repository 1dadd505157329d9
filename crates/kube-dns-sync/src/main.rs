// # kube-dns-sync - DNS Sync Daemon
//
// This is a THIN integration layer. All sync logic lives in kds-core.
//
// The daemon is responsible for:
// 1. Parsing flags and assembling configuration layers
// 2. Initializing logging and the runtime
// 3. Registering providers and connecting to the cluster
// 4. Running the sync engine until SIGINT/SIGTERM
//
// ## Configuration
//
// Lowest precedence first:
//
// - TOML file given with `--config`
// - `APP_`-prefixed environment variables (`APP_DNS_TOKEN`, `APP_WATCH_INTERVAL`, ...)
// - Flags (`--dns-token`, `--watch-interval`, ...)
//
// ## Example
//
// ```bash
// export APP_DNS_TOKEN=your_token
// kube-dns-sync \
//     --dns-provider cloudflare \
//     --dns-zone example.com \
//     --dns-hostname nodes.example.com \
//     --node-labels node-role.kubernetes.io/edge=true
// ```

use anyhow::Result;
use clap::Parser;
use kds_core::config::{
    ConfigLayer, KEY_DNS_HOSTNAME, KEY_DNS_PROVIDER, KEY_DNS_TOKEN, KEY_DNS_TTL, KEY_DNS_ZONE,
    KEY_DRY_RUN, KEY_KUBECONFIG, KEY_LOG_FORMAT, KEY_NODE_LABELS, KEY_WATCH_INTERVAL, LogFormat,
    SyncConfig,
};
use kds_core::{DnsProvider, ProviderRegistry, SyncEngine, shutdown_channel};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Command-line flags
///
/// No `Debug` derive: the struct may hold the API token.
#[derive(Parser)]
#[command(
    name = "kube-dns-sync",
    about = "Keeps DNS A/AAAA records in sync with the external IPs of ready Kubernetes nodes",
    disable_version_flag = true
)]
struct Args {
    /// Path to a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// DNS provider (cloudflare, digitalocean, linode)
    #[arg(long)]
    dns_provider: Option<String>,

    /// DNS hostname
    #[arg(long)]
    dns_hostname: Option<String>,

    /// DNS zone
    #[arg(long)]
    dns_zone: Option<String>,

    /// DNS TTL, e.g. 5m (0 for provider default)
    #[arg(long)]
    dns_ttl: Option<String>,

    /// DNS provider API token
    #[arg(long)]
    dns_token: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long, value_name = "FILE")]
    kubeconfig: Option<String>,

    /// Interval to watch nodes, e.g. 1m
    #[arg(long)]
    watch_interval: Option<String>,

    /// Labels to filter nodes (key=value,...)
    #[arg(long)]
    node_labels: Option<String>,

    /// Log format (logfmt, json)
    #[arg(long)]
    log_format: Option<String>,

    /// Log planned changes without applying them
    #[arg(long)]
    dry_run: bool,

    /// Print version information
    #[arg(long)]
    version: bool,
}

impl Args {
    /// The flag configuration layer
    fn layer(&self) -> kds_core::Result<ConfigLayer> {
        let mut layer = ConfigLayer::new();
        let values = [
            (KEY_DNS_PROVIDER, &self.dns_provider),
            (KEY_DNS_HOSTNAME, &self.dns_hostname),
            (KEY_DNS_ZONE, &self.dns_zone),
            (KEY_DNS_TTL, &self.dns_ttl),
            (KEY_DNS_TOKEN, &self.dns_token),
            (KEY_KUBECONFIG, &self.kubeconfig),
            (KEY_WATCH_INTERVAL, &self.watch_interval),
            (KEY_NODE_LABELS, &self.node_labels),
            (KEY_LOG_FORMAT, &self.log_format),
        ];
        for (key, value) in values {
            if let Some(value) = value {
                layer.set(key, value.clone())?;
            }
        }
        if self.dry_run {
            layer.set(KEY_DRY_RUN, "true")?;
        }
        Ok(layer)
    }
}

/// Merge file, environment and flag layers
fn load_config(args: &Args, env: ConfigLayer) -> Result<SyncConfig> {
    let file = match &args.config {
        Some(path) => ConfigLayer::from_file(path)?,
        None => ConfigLayer::new(),
    };
    Ok(file.merge(env).merge(args.layer()?).resolve()?)
}

fn version_line() -> String {
    format!(
        "{} {} (commit {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("KDS_BUILD_COMMIT").unwrap_or("unknown")
    )
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` controls the level, `info` by default.
fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = match format {
        LogFormat::Json => true,
        LogFormat::Logfmt => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                SyncExitCode::ConfigError.into()
            } else {
                // --help
                SyncExitCode::CleanShutdown.into()
            };
        }
    };

    if args.version {
        println!("{}", version_line());
        return SyncExitCode::CleanShutdown.into();
    }

    let config = match load_config(&args, ConfigLayer::from_env()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return SyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(config.log_format) {
        eprintln!("{e}");
        return SyncExitCode::ConfigError.into();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting kube-dns-sync");
    if config.dry_run {
        warn!("Running in DRY-RUN mode - no DNS changes will be made");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Register every provider compiled into this build
fn build_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    kds_provider_cloudflare::register(&registry);

    #[cfg(feature = "digitalocean")]
    kds_provider_digitalocean::register(&registry);

    #[cfg(feature = "linode")]
    kds_provider_linode::register(&registry);

    debug!(providers = ?registry.list_providers(), "Registered DNS providers");
    registry
}

/// Run the daemon
async fn run_daemon(config: SyncConfig) -> SyncExitCode {
    let registry = build_registry();

    let provider: Arc<dyn DnsProvider> = match registry.create_provider(&config.provider) {
        Ok(provider) => Arc::from(provider),
        Err(e) => {
            error!(error = %e, "Failed to create DNS provider");
            return SyncExitCode::ConfigError;
        }
    };

    let client = match kds_kube::connect(config.kubeconfig.as_deref()).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to connect to the cluster");
            return SyncExitCode::ConfigError;
        }
    };
    let lister = Arc::new(kds_kube::KubeNodeLister::new(client));

    let (engine, mut events) = match SyncEngine::new(lister, provider, &config) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return SyncExitCode::ConfigError;
        }
    };

    for target in &config.targets {
        info!(
            hostname = %target.fqdn(),
            zone = %target.zone,
            selector = %target.label_selector,
            "Managing hostname"
        );
    }

    // Drains until the engine drops its sender.
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Engine event");
        }
    });

    let (trigger, shutdown) = shutdown_channel();
    let handle = engine.spawn(shutdown);

    let exit = match wait_for_shutdown().await {
        Ok(signal) => {
            info!("Received shutdown signal: {}", signal);
            SyncExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Shutdown error: {}", e);
            SyncExitCode::RuntimeError
        }
    };

    // An in-flight tick is finished, not cut between its delete and create passes.
    trigger.trigger();
    handle.wait().await;

    info!("Shutdown complete");
    exit
}

/// Wait for SIGTERM or SIGINT
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
