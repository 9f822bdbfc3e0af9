//! Webserver loop

use axum::Router;

use crate::prelude::*;

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Cannot listen for shutdown signal: {}", e);
		std::future::pending::<()>().await;
	}
	info!("Shutdown signal received");
}

/// Serve `router` on `listen` until interrupted
pub async fn serve(listen: &str, router: Router) -> ClResult<()> {
	let listener = tokio::net::TcpListener::bind(listen).await.map_err(|e| {
		error!("FATAL: Cannot bind {}: {}", listen, e);
		Error::Io(e)
	})?;
	info!("Listening on HTTP {}", listen);

	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
	Ok(())
}

// vim: ts=4
