// src/server/dev_server.rs

//! HTTP side of the live-reload server.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::server::broadcaster::ReloadBroadcaster;
use crate::server::static_files::{
    content_type, inject_reload_script, resolve_static, EVENTS_PATH, RELOAD_SCRIPT_PATH,
};

const RELOAD_CLIENT: &str = include_str!("../../assets/reload-client.js");
const KEEP_ALIVE: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    /// Project root; `roots` and route directories are relative to it.
    pub root: PathBuf,
    /// Served directories, first match wins.
    pub roots: Vec<String>,
    /// URL prefix -> directory, checked before `roots`.
    pub routes: BTreeMap<String, String>,
}

struct AppState {
    options: ServerOptions,
    fs: Arc<dyn FileSystem>,
    broadcaster: Arc<ReloadBroadcaster>,
}

type SharedState = Arc<AppState>;

pub struct DevServer {
    options: ServerOptions,
    fs: Arc<dyn FileSystem>,
    broadcaster: Arc<ReloadBroadcaster>,
}

impl DevServer {
    pub fn new(
        options: ServerOptions,
        fs: Arc<dyn FileSystem>,
        broadcaster: Arc<ReloadBroadcaster>,
    ) -> Self {
        Self {
            options,
            fs,
            broadcaster,
        }
    }

    /// Bind and start serving in the background.
    pub async fn start(self) -> Result<ServerHandle> {
        let bind = (self.options.host.as_str(), self.options.port);
        let listener = TcpListener::bind(bind)
            .await
            .with_context(|| format!("binding dev server to {}:{}", bind.0, bind.1))?;
        let addr = listener.local_addr()?;

        let broadcaster = Arc::clone(&self.broadcaster);
        let app = build_router(Arc::new(AppState {
            options: self.options,
            fs: self.fs,
            broadcaster: self.broadcaster,
        }));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(%addr, "dev server listening on http://{addr}");
        Ok(ServerHandle {
            addr,
            broadcaster,
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

/// Running server. Dropping it without [`stop`](Self::stop) leaves the
/// server running until the runtime shuts down.
pub struct ServerHandle {
    addr: SocketAddr,
    broadcaster: Arc<ReloadBroadcaster>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Drop all sessions, then shut the server down gracefully.
    pub async fn stop(mut self) -> Result<()> {
        // Open event streams would otherwise hold graceful shutdown forever.
        self.broadcaster.stop();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task
            .await
            .context("dev server task panicked")?
            .context("dev server failed")?;
        info!(addr = %self.addr, "dev server stopped");
        Ok(())
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(handle_events))
        .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
        .fallback(handle_static)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unregisters its session when the event stream is dropped.
struct SessionGuard {
    id: usize,
    broadcaster: Arc<ReloadBroadcaster>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.broadcaster.unregister_client(self.id);
    }
}

async fn handle_events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.broadcaster.register_client();
    let guard = SessionGuard {
        id,
        broadcaster: Arc::clone(&state.broadcaster),
    };

    let stream = ReceiverStream::new(rx).map(move |data| {
        let _session = &guard;
        Ok(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("keep-alive"))
}

async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_CLIENT,
    )
}

async fn handle_static(State(state): State<SharedState>, uri: Uri) -> Response {
    let url_path = uri.path().to_string();
    let lookup_state = Arc::clone(&state);
    let lookup_path = url_path.clone();

    let found = tokio::task::spawn_blocking(move || {
        let opts = &lookup_state.options;
        let file = resolve_static(
            lookup_state.fs.as_ref(),
            &opts.root,
            &opts.roots,
            &opts.routes,
            &lookup_path,
        )?;
        match lookup_state.fs.read(&file) {
            Ok(bytes) => Some((file, bytes)),
            Err(e) => {
                warn!(path = %file.display(), error = %e, "failed to read static file");
                None
            }
        }
    })
    .await;

    let Ok(Some((file, bytes))) = found else {
        debug!(path = %url_path, "not found");
        return (StatusCode::NOT_FOUND, format!("Not found: {url_path}")).into_response();
    };

    let ct = content_type(&file);
    let body = if ct.starts_with("text/html") {
        inject_reload_script(&bytes)
    } else {
        bytes
    };
    (
        [(header::CONTENT_TYPE, ct), (header::CACHE_CONTROL, "no-cache")],
        body,
    )
        .into_response()
}
