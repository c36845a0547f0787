//! fusion-ctl
//!
//! Converges Pure Storage Fusion resources to a declared state and gathers
//! inventory. Every invocation prints one JSON record on stdout; logs go to
//! stderr.

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fusion_ctl::inventory::info_record;
use fusion_ctl::{
    ClientConfig, DesiredState, FusionClient, HardwareType, InventoryAggregator,
    OperationPoller, PollerConfig, ReconcileOptions, ReconcileOutcome, Reconciler,
    ResourceDeclaration, Result, StorageServiceSpec, Subset, TenantSpaceSpec, TenantSpec,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Declarative management of Pure Storage Fusion resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fusion API host
    #[arg(
        long,
        env = "FUSION_HOST",
        default_value = "https://api.pure1.purestorage.com/fusion"
    )]
    host: String,

    /// Bearer access token
    #[arg(long, env = "FUSION_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// REST API version
    #[arg(long, env = "FUSION_API_VERSION", default_value = "1.1")]
    api_version: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "FUSION_REQUEST_TIMEOUT", default_value = "30")]
    request_timeout_secs: u64,

    /// Poll interval used when the service gives no retry hint
    #[arg(long, env = "FUSION_POLL_INTERVAL_MS", default_value = "1000")]
    poll_interval_ms: u64,

    /// Stop waiting for an operation after this many seconds
    #[arg(long, env = "FUSION_POLL_TIMEOUT")]
    poll_timeout_secs: Option<u64>,

    /// Report what would change without changing anything
    #[arg(long, env = "FUSION_CHECK_MODE")]
    check_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Gather inventory information
    Info {
        /// Subset to gather; repeat for several
        #[arg(long = "gather-subset")]
        gather_subset: Vec<String>,
    },
    #[command(flatten)]
    Reconcile(ReconcileCommand),
}

/// Commands that converge one resource
#[derive(Subcommand, Debug)]
enum ReconcileCommand {
    /// Create, update or delete a storage service
    StorageService {
        #[arg(long)]
        name: String,
        #[arg(long)]
        display_name: Option<String>,
        /// Hardware type; repeat for several (creation only)
        #[arg(long = "hardware-type", value_enum)]
        hardware_types: Vec<HardwareType>,
        #[command(flatten)]
        state: StateArg,
    },
    /// Create, update or delete a tenant
    Tenant {
        #[arg(long)]
        name: String,
        #[arg(long)]
        display_name: Option<String>,
        #[command(flatten)]
        state: StateArg,
    },
    /// Create, update or delete a tenant space
    TenantSpace {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        display_name: Option<String>,
        #[command(flatten)]
        state: StateArg,
    },
    /// Reconcile the resource described by a YAML or JSON file
    Apply {
        #[arg(long, short)]
        file: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct StateArg {
    #[arg(long, value_enum, default_value_t = DesiredState::Present)]
    state: DesiredState,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting {} {}", fusion_ctl::NAME, fusion_ctl::VERSION);
    info!("  Host: {}", args.host);
    info!("  API version: {}", args.api_version);
    info!("  Check mode: {}", args.check_mode);

    match run(&args).await {
        Ok(result) => {
            println!("{}", result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            println!("{}", e.failure_record());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<Value> {
    let client = Arc::new(FusionClient::new(client_config(args))?);

    match &args.command {
        Command::Info { gather_subset } => {
            // Validate before touching the API
            let subsets = Subset::parse_all(gather_subset)?;
            let aggregator = InventoryAggregator::new(client.clone(), client);
            Ok(info_record(aggregator.gather(&subsets).await?))
        }
        Command::Reconcile(command) => {
            let poller = OperationPoller::new(client.clone(), poller_config(args));
            let reconciler = Reconciler::new(client, poller).with_options(ReconcileOptions {
                check_mode: args.check_mode,
                ..Default::default()
            });
            let outcome = reconcile_command(&reconciler, command).await?;
            Ok(serde_json::to_value(outcome)?)
        }
    }
}

async fn reconcile_command(
    reconciler: &Reconciler,
    command: &ReconcileCommand,
) -> Result<ReconcileOutcome> {
    match command {
        ReconcileCommand::StorageService {
            name,
            display_name,
            hardware_types,
            state,
        } => {
            let spec = StorageServiceSpec {
                name: name.clone(),
                display_name: display_name.clone(),
                hardware_types: (!hardware_types.is_empty()).then(|| hardware_types.clone()),
            };
            reconciler.reconcile(&spec, state.state).await
        }
        ReconcileCommand::Tenant {
            name,
            display_name,
            state,
        } => {
            let spec = TenantSpec {
                name: name.clone(),
                display_name: display_name.clone(),
            };
            reconciler.reconcile(&spec, state.state).await
        }
        ReconcileCommand::TenantSpace {
            tenant,
            name,
            display_name,
            state,
        } => {
            let spec = TenantSpaceSpec {
                tenant: tenant.clone(),
                name: name.clone(),
                display_name: display_name.clone(),
            };
            reconciler.reconcile(&spec, state.state).await
        }
        ReconcileCommand::Apply { file } => {
            ResourceDeclaration::load(file)?.apply(reconciler).await
        }
    }
}

fn client_config(args: &Args) -> ClientConfig {
    ClientConfig {
        host: args.host.clone(),
        api_version: args.api_version.clone(),
        access_token: args.access_token.clone(),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        ..Default::default()
    }
}

fn poller_config(args: &Args) -> PollerConfig {
    PollerConfig {
        default_interval: Duration::from_millis(args.poll_interval_ms),
        deadline: args.poll_timeout_secs.map(Duration::from_secs),
        ..Default::default()
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    for directive in ["hyper=warn", "reqwest=warn", "rustls=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
