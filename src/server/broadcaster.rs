// src/server/broadcaster.rs

//! Connected browser sessions and the signals pushed to them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Buffered signals per session before new ones are dropped.
const CLIENT_BUFFER: usize = 32;

/// What a browser should do after a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadSignal {
    /// Full page reload.
    Reload,
    /// Re-fetch the listed stylesheets in place.
    Css { paths: Vec<String> },
}

impl ReloadSignal {
    /// Stylesheet injection when every changed path is a `.css` file,
    /// a full reload otherwise.
    pub fn for_changes(url_paths: &[String]) -> Self {
        if !url_paths.is_empty() && url_paths.iter().all(|p| p.ends_with(".css")) {
            ReloadSignal::Css {
                paths: url_paths.to_vec(),
            }
        } else {
            ReloadSignal::Reload
        }
    }
}

/// Owns the set of live client sessions.
#[derive(Debug, Default)]
pub struct ReloadBroadcaster {
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_id: AtomicUsize,
}

impl ReloadBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session; the receiver yields serialized signals.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.write().insert(id, tx);
        debug!(client = id, "client connected");
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        if self.clients.write().remove(&id).is_some() {
            debug!(client = id, "client disconnected");
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send `signal` to every session. Sessions whose channel is closed are
    /// removed. Returns the number of sessions reached.
    pub fn broadcast(&self, signal: &ReloadSignal) -> usize {
        let payload = match serde_json::to_string(signal) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize reload signal");
                return 0;
            }
        };

        let clients: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in clients {
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(client = id, "client is not keeping up; signal dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut guard = self.clients.write();
            for id in &closed {
                guard.remove(id);
            }
            debug!(pruned = closed.len(), "removed closed client sessions");
        }

        info!(clients = delivered, signal = %payload, "broadcast reload signal");
        delivered
    }

    /// Report rewritten URL paths after a successful task run.
    pub fn notify_changed(&self, url_paths: &[String]) {
        if url_paths.is_empty() {
            return;
        }
        self.broadcast(&ReloadSignal::for_changes(url_paths));
    }

    pub fn reload(&self) {
        self.broadcast(&ReloadSignal::Reload);
    }

    /// Drop every session; their event streams end.
    pub fn stop(&self) {
        let dropped = {
            let mut guard = self.clients.write();
            let n = guard.len();
            guard.clear();
            n
        };
        debug!(sessions = dropped, "broadcaster stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_only_changes_inject_stylesheets() {
        let css = vec!["/assets/styles/a.css".to_string()];
        assert_eq!(
            ReloadSignal::for_changes(&css),
            ReloadSignal::Css { paths: css.clone() }
        );

        let mixed = vec!["/assets/styles/a.css".to_string(), "/index.html".to_string()];
        assert_eq!(ReloadSignal::for_changes(&mixed), ReloadSignal::Reload);
        assert_eq!(ReloadSignal::for_changes(&[]), ReloadSignal::Reload);
    }

    #[test]
    fn signals_serialize_with_a_type_tag() {
        let json = serde_json::to_string(&ReloadSignal::Css {
            paths: vec!["/a.css".into()],
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"css","paths":["/a.css"]}"#);
        assert_eq!(
            serde_json::to_string(&ReloadSignal::Reload).unwrap(),
            r#"{"type":"reload"}"#
        );
    }

    #[tokio::test]
    async fn broadcast_reaches_sessions_and_prunes_closed_ones() {
        let b = ReloadBroadcaster::new();
        let (_a, mut rx_a) = b.register_client();
        let (_c, rx_c) = b.register_client();
        drop(rx_c);
        assert_eq!(b.client_count(), 2);

        assert_eq!(b.broadcast(&ReloadSignal::Reload), 1);
        assert_eq!(b.client_count(), 1);
        assert_eq!(rx_a.recv().await.unwrap(), r#"{"type":"reload"}"#);
    }

    #[tokio::test]
    async fn stop_ends_every_stream() {
        let b = ReloadBroadcaster::new();
        let (id, mut rx) = b.register_client();
        b.stop();
        assert_eq!(b.client_count(), 0);
        assert!(rx.recv().await.is_none());
        b.unregister_client(id);
    }
}
