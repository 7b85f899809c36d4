//! Content Responder: HTTPS static file server for the watched root.
//!
//! Serves files under the root, injects the reload bootstrap script into
//! HTML, and acknowledges POST bodies. Runs on its own threads; blocking
//! I/O here never touches the cooperative reload context.

mod inject;
mod listing;
mod path;
mod response;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tiny_http::{Method, Request, Server, SslConfig};

use crate::core::Shutdown;
use crate::embed::serve::{RELOAD_JS, ReloadVars};
use crate::log;
use path::{Resolved, resolve_path};

/// Worker threads handling requests concurrently.
const WORKERS: usize = 4;

/// Per-server request context, shared by all workers.
pub struct ServeContext {
    root: PathBuf,
    /// Rendered `<script>` tag injected into HTML responses
    script: String,
}

impl ServeContext {
    pub fn new(root: &Path, reload: ReloadVars) -> Self {
        Self {
            root: root.to_path_buf(),
            script: RELOAD_JS.inline_tag(&reload),
        }
    }
}

/// Bound content server ready to accept requests
pub struct ContentServer {
    server: Arc<Server>,
    addr: SocketAddr,
    ctx: Arc<ServeContext>,
}

impl ContentServer {
    /// Bind the content port with TLS. Failing to bind is fatal for startup.
    pub fn bind(addr: SocketAddr, ssl: SslConfig, ctx: ServeContext) -> Result<Self> {
        let server = Server::https(addr, ssl)
            .map_err(|e| anyhow!("Failed to bind content endpoint on {addr}: {e}"))?;
        Self::from_server(server, ctx)
    }

    fn from_server(server: Server, ctx: ServeContext) -> Result<Self> {
        let addr = server
            .server_addr()
            .to_ip()
            .context("content endpoint is not an IP listener")?;
        Ok(Self {
            server: Arc::new(server),
            addr,
            ctx: Arc::new(ctx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle used to unblock the request loop on shutdown.
    pub fn handle(&self) -> Arc<Server> {
        Arc::clone(&self.server)
    }

    /// Start the request loop (blocking) until the server is unblocked.
    pub fn run(self, shutdown: Arc<Shutdown>) -> Result<()> {
        // Use thread pool to handle requests concurrently
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(WORKERS)
            .thread_name(|i| format!("serve-{i}"))
            .build()
            .context("Failed to create request thread pool")?;

        for request in self.server.incoming_requests() {
            let ctx = Arc::clone(&self.ctx);
            let shutdown = Arc::clone(&shutdown);
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &ctx, &shutdown) {
                    log!("serve"; "request error: {e:#}");
                }
            });
        }

        crate::debug!("serve"; "request loop stopped");
        Ok(())
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, ctx: &ServeContext, shutdown: &Shutdown) -> Result<()> {
    // Early exit if shutdown requested
    if shutdown.is_requested() {
        return response::respond_unavailable(request);
    }

    crate::debug!("serve"; "{} {}", request.method(), request.url());

    match request.method() {
        Method::Get | Method::Head => match resolve_path(request.url(), &ctx.root) {
            Resolved::File(path) => response::respond_file(request, &path, &ctx.script),
            Resolved::Directory(dir) => response::respond_listing(request, &dir, &ctx.script),
            Resolved::Redirect(location) => response::respond_redirect(request, &location),
            Resolved::NotFound => response::respond_not_found(request),
        },
        Method::Post => response::respond_post(request),
        _ => response::respond_method_not_allowed(request),
    }
}
