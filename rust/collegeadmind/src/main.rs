mod batches;
mod config;
mod db;
mod error;
mod http;
mod ipc;
mod program;
mod promotion;
mod roster;
mod sessions;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(name = "collegeadmind", version, about = "Academic session and promotion service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve(ServeArgs),
    /// Answer line-delimited JSON requests on stdin (the default)
    Sidecar,
}

#[derive(Args)]
struct ServeArgs {
    /// JSON config file; flags below override its fields
    #[arg(long, env = "COLLEGEADMIND_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "COLLEGEADMIND_WORKSPACE")]
    workspace: Option<PathBuf>,

    #[arg(long, env = "COLLEGEADMIND_HOST")]
    host: Option<String>,

    #[arg(long, env = "COLLEGEADMIND_PORT")]
    port: Option<u16>,
}

impl ServeArgs {
    fn resolve(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(w) = self.workspace {
            config.workspace = w;
        }
        if let Some(h) = self.host {
            config.host = h;
        }
        if let Some(p) = self.port {
            config.port = p;
        }
        Ok(config)
    }
}

fn init_tracing() {
    // stdout carries protocol traffic; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("collegeadmind=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_sidecar() {
    let mut state = ipc::AppState::default();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(stdout, "{}", resp);
        let _ = stdout.flush();
    }
}

fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    let conn = db::open_db(&config.workspace)
        .with_context(|| format!("opening workspace {}", config.workspace.display()))?;
    tracing::info!(workspace = %config.workspace.display(), "workspace opened");

    let state = http::HttpState::new(config.workspace.clone(), conn);
    let server = http::HttpServer::new(config, state);

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server.start())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match cli.command.unwrap_or(Command::Sidecar) {
        Command::Sidecar => {
            run_sidecar();
            ExitCode::SUCCESS
        }
        Command::Serve(args) => match run_server(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = ?e, "server exited");
                ExitCode::FAILURE
            }
        },
    }
}
