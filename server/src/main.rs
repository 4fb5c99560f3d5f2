use clap::Parser;
use log::{error, info};
use server::network::GameServer;
use shared::DEFAULT_PORT;
use std::sync::atomic::Ordering;

/// Main entry point of the game server.
/// Parses command-line arguments, binds the listener, and runs the accept
/// and simulate loops until a shutdown signal arrives.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Port to listen on
        #[clap(default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Address to bind to
        #[clap(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
    }

    env_logger::init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let mut server = match GameServer::bind(&address).await {
        Ok(server) => server,
        Err(e) => {
            error!("failed to start server on {}: {}", address, e);
            return Err(e.into());
        }
    };
    info!("starting game server on {}", address);

    // A signal flips the stop flag; both loops notice it and wind down.
    let stop = server.stop_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("received shutdown signal, stopping server");
        stop.store(false, Ordering::SeqCst);
    });

    server.run().await?;

    info!("server shutdown complete");
    Ok(())
}

/// Completes on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
