//! Service wiring and lifecycle

use crate::application::correlator::LocationCorrelator;
use crate::application::intents::{IntentBuilder, RetryPolicy};
use crate::application::ledger::OrderLedger;
use crate::application::sweeper::SessionSweeper;
use crate::application::verifier::{ClaimVerifier, SignatureVerifier};
use crate::config::{GatewayConfig, GatewayMode, PayreconConfig};
use crate::domain::ports::PaymentGatewayBox;
use crate::error::Result;
use crate::infrastructure::http_gateway::HttpGateway;
use crate::infrastructure::simulated_gateway::SimulatedGateway;
use crate::infrastructure::storage::{Stores, open_stores};
use crate::interfaces::http::{AppState, create_router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// The reconciliation components, wired once from configuration.
pub struct Services {
    pub state: AppState,
    pub sweeper: Arc<SessionSweeper>,
}

impl Services {
    pub fn build(config: &PayreconConfig, stores: Stores, gateway: PaymentGatewayBox) -> Self {
        let ledger = Arc::new(OrderLedger::new(stores.intents.clone(), stores.orders.clone()));
        let builder = Arc::new(IntentBuilder::new(
            stores.intents.clone(),
            gateway,
            RetryPolicy::from_config(&config.gateway),
        ));
        let verifier = Arc::new(ClaimVerifier::new(
            stores.intents.clone(),
            ledger.clone(),
            SignatureVerifier::new(config.gateway.secret.clone()),
        ));
        let correlator = Arc::new(LocationCorrelator::new(stores.orders.clone()));
        let sweeper = Arc::new(SessionSweeper::new(
            stores.intents.clone(),
            ledger.clone(),
            &config.reconciliation,
        ));

        Self {
            state: AppState::new(stores.intents, builder, verifier, ledger, correlator),
            sweeper,
        }
    }
}

/// Builds the gateway client selected by `gateway.mode`.
pub fn gateway_from_config(config: &GatewayConfig) -> Result<PaymentGatewayBox> {
    Ok(match config.mode {
        GatewayMode::Simulated => {
            tracing::warn!("Using the simulated payment gateway; no real charges are made");
            Arc::new(SimulatedGateway::new(config.secret.clone()))
        }
        GatewayMode::Http => Arc::new(HttpGateway::new(config)?),
    })
}

/// Payment reconciliation server
pub struct Server {
    config: PayreconConfig,
    services: Services,
}

impl Server {
    pub fn new(config: PayreconConfig) -> Result<Self> {
        config.validate()?;
        let stores = open_stores(config.storage.db_path.as_deref())?;
        let gateway = gateway_from_config(&config.gateway)?;
        let services = Services::build(&config, stores, gateway);
        Ok(Self { config, services })
    }

    /// Serves HTTP until Ctrl+C or SIGTERM, then stops the sweeper.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(self.services.state.clone(), self.config.server.enable_cors);
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("payrecon listening on {}", addr);
        tracing::info!(mode = ?self.config.gateway.mode, "Payment gateway configured");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = tokio::spawn(self.services.sweeper.clone().run(shutdown_rx));

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("payrecon shutting down");
        let _ = shutdown_tx.send(true);
        if let Err(e) = sweeper.await {
            tracing::error!(error = %e, "Session sweeper task failed");
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
