use crate::{create_router, AppState};
use dottie_core::Result;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

pub struct Server {
    state: AppState,
    addr: SocketAddr,
}

impl Server {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { state, addr }
    }

    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!("Dottie triage service listening on http://{}", self.addr);
        info!("  GET  /health");
        info!("  POST /analyzeSymptoms");
        info!("  POST /api/v1/symptoms/analyze");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
