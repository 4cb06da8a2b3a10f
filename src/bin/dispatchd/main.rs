mod args;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dispatch_queue::config::Config;
use dispatch_queue::queue::PriorityQueue;
use dispatch_queue::server::handle_conn;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::{select, signal, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Level};

use crate::args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .init();
    } else {
        tracing_subscriber::fmt().json().init();
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(error) => {
            error!(error = %format!("{error:#}"), "invalid configuration");
            return ExitCode::from(2);
        },
    };

    // Cancellation and termination channel.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(error) = signal::ctrl_c().await {
                warn!(%error, "something strange with ctrl-c handling!");
            };
            cancel.cancel();
        });
    }

    // Every connection task holds a clone of the sender; the channel closes
    // once they have all finished.
    let (shutdown_hold, mut shutdown_wait) = mpsc::channel::<()>(1);

    let grace = config.shutdown_grace();
    let exit_code =
        if let Err(error) = begin(config, cancel, shutdown_hold).await {
            error!(error = %format!("{error:#}"), "encountered runtime error");
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };

    if time::timeout(grace, shutdown_wait.recv()).await.is_err() {
        warn!(?grace, "connections still open after grace period");
    }

    exit_code
}

/// Merges the config file, if any, with flags given on the command line.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max_line_len) = args.max_line_len {
        config.max_line_len = max_line_len;
    }
    if let Some(secs) = args.shutdown_grace_secs {
        config.shutdown_grace_secs = secs;
    }

    config.validate()?;

    Ok(config)
}

async fn begin(
    config: Config,
    cancel: CancellationToken,
    shutdown_hold: mpsc::Sender<()>,
) -> Result<()> {
    let listener = TcpListener::bind((config.listen, config.port))
        .await
        .with_context(|| {
            format!("binding to {}:{}", config.listen, config.port)
        })?;
    info!(addr = %listener.local_addr()?, "listening");

    let queue: Arc<PriorityQueue> = Arc::new(PriorityQueue::default());

    // Accept incoming connections until an exit signal is sent, and handle each
    // connection as its own task.
    loop {
        let conn = match select! {
            accept = listener.accept() => accept,
            _ = cancel.cancelled() => break,
        } {
            Ok((conn, _)) => conn,
            Err(error) => {
                warn!(%error, "failed to accept connection");
                continue;
            },
        };

        tokio::spawn(begin_handle(
            cancel.clone(),
            shutdown_hold.clone(),
            Arc::clone(&queue),
            config.max_line_len,
            conn,
        ));
    }

    info!("no longer accepting connections");

    Ok(())
}

#[instrument(name = "handle", err, fields(peer = %conn.peer_addr()?), skip_all)]
async fn begin_handle(
    cancel: CancellationToken,
    _shutdown_hold: mpsc::Sender<()>,
    queue: Arc<PriorityQueue>,
    max_line_len: usize,
    mut conn: TcpStream,
) -> Result<()> {
    debug!("accepted connection");

    conn.set_nodelay(true).context("setting NODELAY")?;

    let ret = handle_conn(cancel, &mut conn, queue.as_ref(), max_line_len)
        .await
        .context("serving connection");

    conn.shutdown().await.context("during shutdown")?;

    debug!("closed connection");

    ret
}
