use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use kubeplay::config::{self, Config};
use kubeplay::kube::{ClusterConfig, KubeApi, KubeClient};
use kubeplay::repl::{EditMode, Evaluator, ExitReason, IoHost, Output, ReplCore, TerminalHost};
use kubeplay::script::ScriptEngine;
use kubeplay::VERSION;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Interactive scripting shell for Kubernetes
#[derive(Parser, Debug)]
#[command(name = "kubeplay", version, about, long_about = None)]
struct Args {
    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,

    /// Default namespace for `get` calls
    #[arg(short, long)]
    namespace: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Use vi key bindings in the line editor
    #[arg(long)]
    vi: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("kubeplay {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(dir) = config::config_dir() {
        return dir.join("kubeplay.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".kubeplay").join("kubeplay.log");
    }
    PathBuf::from("kubeplay.log")
}

fn main() {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    let code = match run(&args) {
        Ok(reason) => reason.exit_code(),
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            1
        }
    };

    // process::exit skips destructors, flush the log writer first
    drop(log_guard);
    std::process::exit(code);
}

fn run(args: &Args) -> Result<ExitReason> {
    let mut config = Config::load();

    // Script calls block on cluster requests, so the runtime lives outside the REPL
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let kubeconfig = config.effective_kubeconfig(args.kubeconfig.as_deref());
    let context = config.effective_context(args.context.as_deref());
    let cluster = ClusterConfig::discover(kubeconfig.as_deref(), context.as_deref())?;
    let namespace =
        config.effective_namespace(args.namespace.as_deref(), cluster.namespace.as_deref());

    tracing::info!(
        "Using context: {}, server: {}, namespace: {}",
        cluster.context,
        cluster.server,
        namespace
    );

    let context_name = cluster.context.clone();
    let client = KubeClient::new(cluster)?;
    let api = Rc::new(KubeApi::new(client, runtime.handle().clone()));
    let engine = ScriptEngine::new(api, context_name.clone(), namespace)
        .map_err(|e| anyhow::anyhow!("Failed to set up script engine: {}", e))?;

    let edit_mode = if args.vi {
        EditMode::Vi
    } else {
        config
            .edit_mode
            .as_deref()
            .and_then(EditMode::parse)
            .unwrap_or_else(EditMode::from_env)
    };

    let mut host = TerminalHost::new(edit_mode);
    host.write_output(Output::info(format!(
        "kubeplay {} connected to {}. Resources: {}",
        VERSION,
        context_name,
        engine.runtime().resource_keys().join(", ")
    )))
    .context("Failed to write banner")?;

    let mut repl = ReplCore::new(engine);
    let reason = repl.run(&mut host)?;

    if let Err(e) = config.remember_namespace(&repl.evaluator().namespace()) {
        tracing::warn!("Failed to save config: {:#}", e);
    }

    Ok(reason)
}
