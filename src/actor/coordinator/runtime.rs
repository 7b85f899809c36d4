use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::watch;

use crate::actor::bridge::ReloadBridge;
use crate::actor::ws::WsActor;
use crate::reload::server::ReloadServer;

/// Grace period for each actor to wind down after shutdown.
const STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// Run the reload side until shutdown is requested.
pub(super) async fn run_actors(
    ws: WsActor,
    server: ReloadServer,
    bridge: ReloadBridge,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let ws_handle = tokio::spawn(ws.run());
    let server_handle = tokio::spawn(server.run(shutdown_rx.clone()));

    let _ = shutdown_rx.wait_for(|stop| *stop).await;
    crate::debug!("actor"; "shutdown signal received");

    bridge.shutdown();
    let _ = tokio::time::timeout(STOP_TIMEOUT, ws_handle).await;
    let _ = tokio::time::timeout(STOP_TIMEOUT, server_handle).await;
}

/// Wait for the content thread to finish (max 2 seconds).
pub(super) fn wait_for_content(handle: JoinHandle<Result<()>>) -> Result<()> {
    for _ in 0..40 {
        if handle.is_finished() {
            return handle
                .join()
                .map_err(|_| anyhow!("content server thread panicked"))?;
        }
        thread::sleep(Duration::from_millis(50));
    }
    crate::debug!("serve"; "content server still draining, exiting anyway");
    Ok(())
}
