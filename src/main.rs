mod db;
mod forms;
mod ipc;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "formsd")]
#[command(about = "Entity form submission daemon (JSON lines over stdio)")]
struct Cli {
    /// Workspace directory to open on startup
    #[arg(long, env = "FORMSD_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Log filter, e.g. `info` or `formsd=debug`
    #[arg(long, env = "FORMSD_LOG", default_value = "info")]
    log: String,
}

fn main() {
    let cli = Cli::parse();

    // stdout carries responses; logs go to stderr.
    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut state = ipc::AppState::new();
    if let Some(path) = cli.workspace.as_deref() {
        if let Err(e) = ipc::select_workspace(&mut state, path) {
            error!(workspace = %path.display(), error = ?e, "startup workspace not opened");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "formsd ready");

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
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
