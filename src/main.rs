mod cache;
mod cascade;
mod clock;
mod codec;
mod config;
mod controller;
mod dto;
mod error;
mod ipc;
mod model;
mod registry;
mod repo;
mod store;
mod usecases;

use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(cfg: &config::DaemonConfig) {
    // stdout carries the IPC responses.
    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let cfg = config::DaemonConfig::from_env();
    init_tracing(&cfg);
    for w in &cfg.warnings {
        warn!("{w}");
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        cache_ttl_secs = cfg.cache_ttl.num_seconds(),
        cache_policy = ?cfg.cache_policy,
        "courseteamsd starting"
    );

    let mut state = ipc::AppState::new(cfg);

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
                // No id to echo back.
                let resp = ipc::err("", "bad_json", e.to_string(), None);
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed; exiting");
}
