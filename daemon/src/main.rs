/// swankd - SWANK protocol server for the rhai scripting runtime
/// Lets a SLIME client connect, evaluate code, and complete symbols.
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use swank_core::{Evaluator, RhaiEvaluator};
use swank_daemon::{repl, startup, DaemonConfig, SwankServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "swankd",
    about = "SWANK server exposing a rhai runtime to SLIME clients",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Path to configuration file (TOML)"
    )]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(short, long, value_name = "ADDR", help = "Bind address (default: 127.0.0.1)")]
    bind: Option<String>,

    /// TCP port
    #[arg(
        short,
        long,
        value_name = "PORT",
        help = "TCP port; 0 lets the kernel pick (default: 4005)"
    )]
    port: Option<u16>,

    /// Port file
    #[arg(
        long,
        value_name = "PATH",
        help = "Write the chosen port to this file"
    )]
    port_file: Option<PathBuf>,

    /// Payload encoding
    #[arg(
        long,
        value_name = "NAME",
        help = "Wire encoding: utf-8 or latin-1 (default: utf-8)"
    )]
    encoding: Option<String>,

    /// Log level
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    log_level: String,

    /// Disable the console REPL
    #[arg(long, help = "Do not run the interactive console")]
    no_repl: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(args.log_level.parse()?))
        .with_target(false)
        .init();

    info!("Starting swankd v{}", swank_daemon::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            DaemonConfig::load(path)?
        }
        None => DaemonConfig::default(),
    };

    // Apply CLI overrides
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(path) = args.port_file {
        config.server.port_file = Some(path);
    }
    if let Some(encoding) = args.encoding {
        config.server.encoding = encoding;
    }

    let interactive = atty::is(atty::Stream::Stdin);

    // A client that launched us pipes a setup form into stdin naming the
    // port file to advertise in.
    if !interactive {
        if let Ok(line) = startup::read_setup_line() {
            if let Some(path) = startup::port_file_from_setup_form(&line) {
                info!("Setup form requests port file {}", path.display());
                config.server.port_file = Some(path);
            }
        }
    }

    config.validate()?;

    let evaluator: Arc<dyn Evaluator> = Arc::new(RhaiEvaluator::new());
    let server = SwankServer::bind(&config, Arc::clone(&evaluator)).await?;

    if interactive && !args.no_repl {
        let console = Arc::clone(&evaluator);
        tokio::spawn(async move {
            if let Err(err) = repl::run(console).await {
                eprintln!("console error: {err:?}");
            }
        });
    }

    tokio::select! {
        () = shutdown_signal() => {
            info!("Shutting down swankd...");
        }
        result = server.run() => {
            result?;
        }
    }

    info!("swankd stopped");
    Ok(())
}

/// Resolves once the process is told to stop: ctrl-c everywhere, SIGTERM
/// on unix as well.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("cannot listen for SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("interrupt received"),
            _ = sigterm.recv() => info!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("interrupt received");
    }
}
