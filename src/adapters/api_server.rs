use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::error::Result;
use crate::services::PredictionService;

/// Start the API server and run it until `shutdown` resolves
pub async fn start_api_server<F>(
    service: Arc<PredictionService>,
    port: u16,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("API server listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("API server stopped");
    Ok(())
}
