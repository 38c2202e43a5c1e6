// # cf-ddns
//
// Keeps the A records of one hostname equal to the set of public IPv4
// addresses this host egresses from.
//
// This binary is a THIN integration layer:
// - Parses the command line (options may also come from `CF_DDNS_*` variables)
// - Installs the stderr log subscriber
// - Wires the HTTP probe, the Cloudflare store and a snapshot cache into the
//   core engine and runs exactly one pass
// - Manages the systemd timer that repeats the pass every minute
//
// All reconciliation logic lives in cf-ddns-core.
//
// ## Output Contract
//
// `sync` never writes to stdout. Logs and the final `ERROR: ...` line go to
// stderr. Exit code 0 means the hostname is converged, 1 means a fatal error.
//
// ## Example
//
// ```bash
// export CF_DDNS_API_TOKEN=...
// cf-ddns sync --target home.example.com --zone-id 023e105f... --source eth0,wwan0
// sudo -E cf-ddns install --target home.example.com --zone-id 023e105f... --source eth0,wwan0
// ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use cf_ddns_core::config::{DEFAULT_CACHE_DIR, DEFAULT_TTL};
use cf_ddns_core::traits::SnapshotCache;
use cf_ddns_core::{
    FileSnapshotCache, MemorySnapshotCache, ReconcilePolicy, SyncConfig, SyncEngine,
};
use cf_ddns_ip_http::HttpAddressProbe;
use cf_ddns_provider_cloudflare::CloudflareRecordStore;

mod units;

/// Process exit codes
///
/// The systemd timer only distinguishes success from failure.
#[derive(Debug, Clone, Copy)]
enum CfDdnsExitCode {
    /// Hostname converged, or unit command succeeded
    Success = 0,
    /// Any fatal error
    Failure = 1,
}

impl From<CfDdnsExitCode> for ExitCode {
    fn from(code: CfDdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "cf-ddns",
    version,
    about = "Cloudflare multi-address dynamic DNS",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one reconciliation pass
    Sync(SyncArgs),
    /// Install a systemd timer that runs `sync` every minute
    Install(SyncArgs),
    /// Remove the systemd timer and service for a hostname
    Uninstall(TargetArgs),
    /// Show timer and service state plus recent journal lines
    Status(TargetArgs),
}

/// How much gets logged to stderr
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Fatal errors only
    Silent,
    /// Record changes
    Changes,
    /// Every step of the pass
    Everything,
}

impl Verbosity {
    pub fn max_level(self) -> Level {
        match self {
            Verbosity::Silent => Level::ERROR,
            Verbosity::Changes => Level::INFO,
            Verbosity::Everything => Level::DEBUG,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verbosity::Silent => "silent",
            Verbosity::Changes => "changes",
            Verbosity::Everything => "everything",
        }
    }
}

/// Options shared by `sync` and `install`
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Hostname whose A records are managed
    #[arg(long, env = "CF_DDNS_TARGET")]
    pub target: String,

    /// Cloudflare zone identifier
    #[arg(long, env = "CF_DDNS_ZONE_ID")]
    pub zone_id: String,

    /// Cloudflare API token with DNS edit permission
    #[arg(long, env = "CF_DDNS_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Interfaces to probe, comma-separated (default route when omitted)
    #[arg(long = "source", env = "CF_DDNS_SOURCE", value_delimiter = ',')]
    pub sources: Vec<String>,

    /// TTL for created and updated records
    #[arg(long, env = "CF_DDNS_TTL", default_value_t = DEFAULT_TTL)]
    pub ttl: u32,

    /// Directory holding the per-hostname record snapshots
    #[arg(long, env = "CF_DDNS_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Always list records from the API instead of trusting the snapshot
    #[arg(long)]
    pub no_cache: bool,

    #[arg(long, env = "CF_DDNS_VERBOSITY", value_enum, default_value_t = Verbosity::Changes)]
    pub verbosity: Verbosity,

    /// Rewrite a stale record in place instead of delete + create
    #[arg(long)]
    pub reuse_slot: bool,

    /// Rewrite records whose TTL differs from --ttl
    #[arg(long)]
    pub reconcile_ttl: bool,

    /// Create records even when the hostname has none of any type yet
    #[arg(long)]
    pub allow_unknown_host: bool,
}

impl SyncArgs {
    /// Build the engine configuration
    pub fn to_config(&self) -> SyncConfig {
        let interfaces = self
            .sources
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        SyncConfig::new(&self.target, &self.zone_id, &self.api_token)
            .with_interfaces(interfaces)
            .with_ttl(self.ttl)
            .with_cache_dir(&self.cache_dir)
            .with_cache_enabled(!self.no_cache)
            .with_policy(ReconcilePolicy {
                reuse_slot_on_single_change: self.reuse_slot,
                reconcile_ttl: self.reconcile_ttl,
                require_known_host: !self.allow_unknown_host,
            })
    }

    /// Command-line arguments that reproduce these options, minus the token
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--target".to_string(),
            self.target.clone(),
            "--zone-id".to_string(),
            self.zone_id.clone(),
        ];

        let config = self.to_config();
        if !config.interfaces.is_empty() {
            args.push("--source".to_string());
            args.push(config.interfaces.join(","));
        }

        args.push("--ttl".to_string());
        args.push(self.ttl.to_string());
        args.push("--cache-dir".to_string());
        args.push(self.cache_dir.display().to_string());
        args.push("--verbosity".to_string());
        args.push(self.verbosity.as_str().to_string());

        for (enabled, flag) in [
            (self.no_cache, "--no-cache"),
            (self.reuse_slot, "--reuse-slot"),
            (self.reconcile_ttl, "--reconcile-ttl"),
            (self.allow_unknown_host, "--allow-unknown-host"),
        ] {
            if enabled {
                args.push(flag.to_string());
            }
        }

        args
    }
}

#[derive(Args, Debug, Clone)]
struct TargetArgs {
    /// Hostname the units were installed for
    #[arg(long, env = "CF_DDNS_TARGET")]
    target: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = match &cli.command {
        Command::Sync(args) | Command::Install(args) => args.verbosity,
        Command::Uninstall(_) | Command::Status(_) => Verbosity::Changes,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(verbosity.max_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("ERROR: Failed to set tracing subscriber: {}", e);
        return CfDdnsExitCode::Failure.into();
    }

    let result = match cli.command {
        Command::Sync(args) => run_sync(&args),
        Command::Install(args) => units::install(&args),
        Command::Uninstall(args) => units::uninstall(&args.target),
        Command::Status(args) => units::status(&args.target),
    };

    match result {
        Ok(()) => CfDdnsExitCode::Success.into(),
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            CfDdnsExitCode::Failure.into()
        }
    }
}

/// Run one pass on a current-thread runtime
fn run_sync(args: &SyncArgs) -> Result<()> {
    let config = args.to_config();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(sync_once(config))
}

async fn sync_once(config: SyncConfig) -> Result<()> {
    let store = CloudflareRecordStore::new(config.api_token.clone(), config.zone_id.clone())?;

    let cache: Box<dyn SnapshotCache> = if config.cache_enabled {
        Box::new(FileSnapshotCache::new(&config.cache_dir))
    } else {
        Box::new(MemorySnapshotCache::new())
    };

    let engine = SyncEngine::new(
        Box::new(HttpAddressProbe::new()),
        Box::new(store),
        cache,
        config,
    )?;
    let outcome = engine.run().await?;

    debug!(
        "Pass finished: {} mutation(s), cache {}",
        outcome.plan.mutation_count(),
        if outcome.cache_hit { "hit" } else { "miss" }
    );

    Ok(())
}
