pub mod appstate;
pub mod routes;

use std::net::{Ipv4Addr, SocketAddr};

use log::info;
use tokio::net::TcpListener;

use crate::error::ApiResult;
use crate::server::appstate::AppState;

/// Serve the settings UI on all interfaces until the process exits.
pub async fn serve(state: AppState, port: u16) -> ApiResult<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr).await?;
    info!("Settings UI listening on http://{addr}/");

    let app = routes::router().with_state(state);
    axum::serve(listener, app).await?;

    Ok(())
}
