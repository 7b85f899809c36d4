//! Actor Coordinator - Wires up the Live Reload System
//!
//! The Coordinator is the process-lifetime owner of the client registry. It:
//! - Loads TLS material and starts the watcher before any port is opened
//! - Binds both endpoints
//! - Runs the content server on its own thread and the reload side on a
//!   single-threaded tokio runtime

mod runtime;

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use super::bridge::ReloadBridge;
use super::fs::FsWatcher;
use super::ws::WsActor;
use crate::config::DevConfig;
use crate::core::Shutdown;
use crate::embed::serve::ReloadVars;
use crate::log;
use crate::reload::broadcast::Broadcaster;
use crate::reload::registry::ClientRegistry;
use crate::reload::server::ReloadServer;
use crate::serve::{ContentServer, ServeContext};
use crate::tls::TlsMaterial;

/// Coordinator - wires up and runs the live reload system.
pub struct Coordinator {
    runtime: Runtime,
    registry: Arc<ClientRegistry>,
    bridge: ReloadBridge,
    ws_actor: WsActor,
    reload_server: ReloadServer,
    content_server: ContentServer,
    watcher: FsWatcher,
    shutdown: Arc<Shutdown>,
}

impl Coordinator {
    /// Perform every startup step. Any error here aborts before serving.
    pub fn start(config: DevConfig, shutdown: Arc<Shutdown>) -> Result<Self> {
        let tls = TlsMaterial::load(&config.tls.cert, &config.tls.key)?;
        let acceptor = tls.acceptor()?;

        let registry = Arc::new(ClientRegistry::new());
        let (bridge, ws_rx) = ReloadBridge::channel();

        let watcher = FsWatcher::start(&config.watch, bridge.clone())?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        let reload_server = runtime.block_on(ReloadServer::bind(
            config.reload_addr(),
            acceptor,
            Arc::clone(&registry),
        ))?;
        let reload_addr = reload_server.local_addr()?;

        let ctx = ServeContext::new(
            &config.watch.root,
            ReloadVars {
                port: reload_addr.port(),
                retry_ms: config.reload.reconnect_ms,
            },
        );
        let content_server = ContentServer::bind(config.serve.addr(), tls.ssl_config(), ctx)?;
        shutdown.register_server(content_server.handle());

        let ws_actor = WsActor::new(
            ws_rx,
            Broadcaster::new(Arc::clone(&registry)),
            config.watch.debounce(),
            watcher.root().to_path_buf(),
        );

        log!("serve"; "https://{}", content_server.addr());
        log!("reload"; "wss://{}", reload_addr);
        log!("watch"; "{}", watcher.root().display());

        Ok(Self {
            runtime,
            registry,
            bridge,
            ws_actor,
            reload_server,
            content_server,
            watcher,
            shutdown,
        })
    }

    /// Serve until shutdown is triggered, then tear everything down.
    pub fn run(self) -> Result<()> {
        let Self {
            runtime,
            registry,
            bridge,
            ws_actor,
            reload_server,
            content_server,
            watcher,
            shutdown,
        } = self;

        let content_shutdown = Arc::clone(&shutdown);
        let content_thread = thread::Builder::new()
            .name("content".into())
            .spawn(move || {
                let result = content_server.run(Arc::clone(&content_shutdown));
                // an early exit of the request loop stops everything else too
                content_shutdown.trigger();
                result
            })
            .context("Failed to spawn content server thread")?;

        crate::debug!("actor"; "start");
        runtime.block_on(runtime::run_actors(
            ws_actor,
            reload_server,
            bridge,
            shutdown.subscribe(),
        ));
        shutdown.trigger();

        drop(watcher);
        drop(runtime);
        crate::debug!("actor"; "stopped ({} clients left)", registry.len());

        runtime::wait_for_content(content_thread)
    }
}
