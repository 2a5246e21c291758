//! otci - drive an OpenThread CLI console bridged to a TCP port.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use otci_controller::{ConfigError, ExecutorConfig, LinePattern, Otci, OtciError};
use otci_transport::TcpTransport;

/// Drive an OpenThread CLI console over TCP.
#[derive(Parser)]
#[command(name = "otci")]
#[command(about = "Run commands against an OpenThread CLI console")]
#[command(version)]
pub struct Cli {
    /// Console bridge address
    #[arg(long, default_value = "127.0.0.1:9000")]
    connect: String,

    /// Executor configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the retry count from the configuration
    #[arg(long)]
    retries: Option<u32>,

    /// Override the command timeout, in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Label for log records
    #[arg(long, default_value = "device")]
    label: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a raw command and print its payload
    Exec {
        /// Command line, e.g. `state` or `channel 15`
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Re-run a command until a line of its output matches
    WaitFor {
        /// Command to poll
        command: String,

        /// Pattern a line must match
        pattern: String,

        /// Treat the pattern as a regular expression
        #[arg(long)]
        regex: bool,

        /// Give up after this many seconds
        #[arg(long, default_value = "30")]
        within: f64,
    },

    /// Print the device role
    State,

    /// Dump a decoded table
    Table {
        #[arg(value_enum)]
        kind: TableKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TableKind {
    Router,
    Child,
    Neighbor,
}

#[derive(Debug, Error)]
enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Otci(#[from] OtciError),

    #[error("invalid option: {0}")]
    Option(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("otci_controller=debug,otci=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<ExecutorConfig, RunnerError> {
    let mut config = match &cli.config {
        Some(path) => ExecutorConfig::from_yaml_file(path)?,
        None => ExecutorConfig::default(),
    };
    if let Some(retries) = cli.retries {
        config.retry_count = retries;
    }
    if let Some(timeout) = cli.timeout {
        config.command_timeout_secs = timeout;
    }
    config.log_label = Some(cli.label.clone());
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), RunnerError> {
    let config = load_config(&cli)?;
    info!(connect = %cli.connect, retries = config.retry_count, "Connecting");

    let transport = TcpTransport::connect(cli.connect.as_str()).map_err(OtciError::from)?;
    let mut otci = Otci::with_config(transport, config);

    let result = match cli.command {
        Commands::Exec { command } => run_exec(&mut otci, &command.join(" ")),
        Commands::WaitFor {
            command,
            pattern,
            regex,
            within,
        } => run_wait_for(&mut otci, &command, &pattern, regex, within),
        Commands::State => {
            let state = otci.get_state()?;
            println!("{state}");
            Ok(())
        }
        Commands::Table { kind } => run_table(&mut otci, kind),
    };

    otci.close()?;
    info!(stats = ?otci.stats(), "Done");
    result
}

fn run_exec(otci: &mut Otci<TcpTransport>, command: &str) -> Result<(), RunnerError> {
    for line in otci.execute(command)? {
        println!("{line}");
    }
    Ok(())
}

fn run_wait_for(
    otci: &mut Otci<TcpTransport>,
    command: &str,
    pattern: &str,
    regex: bool,
    within: f64,
) -> Result<(), RunnerError> {
    let pattern = if regex {
        LinePattern::regex(pattern).map_err(|e| RunnerError::Option(format!("pattern: {e}")))?
    } else {
        LinePattern::literal(pattern)
    };
    let within = Duration::try_from_secs_f64(within).map_err(|e| RunnerError::Option(format!("--within: {e}")))?;

    for line in otci.wait_for(command, &pattern, within)? {
        println!("{line}");
    }
    Ok(())
}

fn run_table(otci: &mut Otci<TcpTransport>, kind: TableKind) -> Result<(), RunnerError> {
    match kind {
        TableKind::Router => {
            println!("{:>3} {:>8} {:>4} {:>4} {:>3} {:>3} {:>5} {:<16} link", "id", "rloc16", "hop", "cost", "lqi", "lqo", "age", "extaddr");
            for r in otci.get_router_table()? {
                println!(
                    "{:>3} {:>8} {:>4} {:>4} {:>3} {:>3} {:>5} {:<16} {}",
                    r.id, r.rloc16, r.next_hop, r.path_cost, r.lq_in, r.lq_out, r.age, r.extaddr, r.link
                );
            }
        }
        TableKind::Child => {
            println!("{:>5} {:>8} {:>7} {:>5} {:>3} {:>4} {:<16}", "id", "rloc16", "timeout", "age", "lqi", "mode", "extaddr");
            for c in otci.get_child_table()? {
                println!(
                    "{:>5} {:>8} {:>7} {:>5} {:>3} {:>4} {:<16}",
                    c.id, c.rloc16, c.timeout, c.age, c.lq_in, c.mode, c.extaddr
                );
            }
        }
        TableKind::Neighbor => {
            println!("{:<4} {:>8} {:>5} {:>4} {:>4} {:>4} {:<16}", "role", "rloc16", "age", "avg", "last", "mode", "extaddr");
            for n in otci.get_neighbor_table()? {
                let role = if n.is_router { "R" } else { "C" };
                println!(
                    "{:<4} {:>8} {:>5} {:>4} {:>4} {:>4} {:<16}",
                    role, n.rloc16, n.age, n.avg_rssi, n.last_rssi, n.mode, n.extaddr
                );
            }
        }
    }
    Ok(())
}
