// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use quantum_gate::api::router;
use quantum_gate::config::{GatewayConfig, LogFormat, DEFAULT_LOG_FILTER};
use quantum_gate::state::AppState;
use quantum_gate::storage::{AuditLog, IdentityRecord, IdentityStore, InMemoryIdentityStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn seed_identities(
    store: &InMemoryIdentityStore,
    seeds: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    for (email, password) in seeds {
        store.insert(IdentityRecord::hash_new(email.as_str(), password)?)?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::from_env()?;
    init_tracing(config.log_format);

    let token_secret = match &config.token_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!("TOKEN_SECRET not set, using a random per-process secret");
            rand::random::<[u8; 32]>().to_vec()
        }
    };

    let identities = InMemoryIdentityStore::new();
    seed_identities(&identities, &config.seed_identities)?;
    let seeded = identities.len()?;
    if seeded > 0 {
        tracing::info!(count = seeded, "Seeded identities");
    }

    // Only cancelled once the server has drained, so in-flight requests
    // can still audit.
    let writer_shutdown = CancellationToken::new();
    let (audit, audit_writer) = AuditLog::new(&config.audit_log_path);
    let writer_task = tokio::spawn(audit_writer.run(writer_shutdown.clone()));

    let state = AppState::new(&token_secret, Arc::new(identities), Arc::new(audit));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Quantum Gate listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Every connection has finished and `serve` has dropped the router
    // along with its audit senders.
    writer_shutdown.cancel();
    if let Err(e) = writer_task.await {
        tracing::error!(error = %e, "Audit writer task failed");
    }

    Ok(())
}
