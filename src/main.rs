mod engine;
mod ipc;
mod model;
mod store;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

fn main() {
    // stdout carries the IPC stream, so diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("academyd=info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut state = ipc::AppState {
        workspace: None,
        store: None,
    };

    // Optional startup workspace; the host can still switch later via
    // workspace.select.
    if let Ok(path) = std::env::var("ACADEMYD_WORKSPACE") {
        let path = PathBuf::from(path);
        match store::SqliteStore::open(&path) {
            Ok(s) => {
                tracing::info!(workspace = %path.display(), "workspace opened from environment");
                state.workspace = Some(path);
                state.store = Some(s);
            }
            Err(e) => {
                tracing::warn!(workspace = %path.display(), error = %e, "could not open workspace from environment");
            }
        }
    }

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
                // Can't reply without id; ignore.
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
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
