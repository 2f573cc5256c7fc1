// tests/dev_server.rs

mod common;
use crate::common::builders::{ProjectBuilder, TempProject};
use crate::common::{init_tracing, with_timeout};

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use pageflow::exec::WatchAction;
use pageflow::fileset::SourceSpec;
use pageflow::fs::mock::MockFileSystem;
use pageflow::fs::{FileSystem, RealFileSystem};
use pageflow::server::{DevServer, ReloadBroadcaster, ServerHandle, ServerOptions};
use pageflow::task::{LeafTask, ServeTask, Task, TaskContext};
use pageflow::transform::builtin::Passthrough;
use pageflow::types::ParallelPolicy;
use pageflow::watch::{WatchBinding, WatchOptions};

fn project() -> TempProject {
    ProjectBuilder::new()
        .file("temp/index.html", "<html><body><h1>temp</h1></body></html>")
        .file("temp/assets/styles/main.css", "body { color: red; }")
        .file("src/index.html", "<html><body>src</body></html>")
        .file("src/assets/images/logo.svg", "<svg/>")
        .file("src/assets/images/my logo.png", "png-bytes")
        .file("public/robots.txt", "User-agent: *")
        .file("node_modules/lib/lib.js", "lib();")
        .file("secret.txt", "top-secret-value")
        .build()
}

fn server_options(root: &Path, port: u16) -> ServerOptions {
    ServerOptions {
        host: "127.0.0.1".to_string(),
        port,
        root: root.to_path_buf(),
        roots: vec!["temp".into(), "src".into(), "public".into()],
        routes: BTreeMap::from([("/node_modules".to_string(), "node_modules".to_string())]),
    }
}

async fn start(project: &TempProject) -> (ServerHandle, Arc<ReloadBroadcaster>) {
    let broadcaster = Arc::new(ReloadBroadcaster::new());
    let options = server_options(project.root(), 0);
    let handle = DevServer::new(options, Arc::new(RealFileSystem), Arc::clone(&broadcaster))
        .start()
        .await
        .unwrap();
    (handle, broadcaster)
}

async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let text = String::from_utf8_lossy(&buf).into_owned();
    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    (status, text)
}

#[tokio::test]
async fn serves_roots_in_order_with_reload_script() {
    init_tracing();
    let project = project();
    let (handle, _) = start(&project).await;
    let addr = handle.addr();

    let (status, body) = with_timeout(get(addr, "/")).await;
    assert_eq!(status, 200);
    assert!(body.contains("<h1>temp</h1>"));
    assert!(body.contains("<script src=\"/__pageflow/reload.js\"></script>\n</body>"));
    assert!(body.to_ascii_lowercase().contains("text/html"));

    let (status, body) = with_timeout(get(addr, "/assets/images/logo.svg")).await;
    assert_eq!(status, 200);
    assert!(body.contains("image/svg+xml"));

    let (status, body) = with_timeout(get(addr, "/robots.txt")).await;
    assert_eq!(status, 200);
    assert!(body.contains("User-agent"));
    assert!(!body.contains("reload.js"));

    with_timeout(handle.stop()).await.unwrap();
}

#[tokio::test]
async fn route_aliases_client_script_and_missing_files() {
    init_tracing();
    let project = project();
    let (handle, _) = start(&project).await;
    let addr = handle.addr();

    let (status, body) = with_timeout(get(addr, "/node_modules/lib/lib.js")).await;
    assert_eq!(status, 200);
    assert!(body.contains("lib();"));

    let (status, body) = with_timeout(get(addr, "/__pageflow/reload.js")).await;
    assert_eq!(status, 200);
    assert!(body.contains("EventSource('/__pageflow/events')"));

    let (status, _) = with_timeout(get(addr, "/nope.css")).await;
    assert_eq!(status, 404);

    let (status, _) = with_timeout(get(addr, "/../secret.txt")).await;
    assert_eq!(status, 404);

    with_timeout(handle.stop()).await.unwrap();
}

#[tokio::test]
async fn encoded_paths_are_decoded_but_never_escape_the_roots() {
    init_tracing();
    let project = project();
    let (handle, _) = start(&project).await;
    let addr = handle.addr();

    let (status, body) = with_timeout(get(addr, "/assets/images/my%20logo.png")).await;
    assert_eq!(status, 200);
    assert!(body.contains("png-bytes"));

    for path in ["/%2e%2e/secret.txt", "/src/%2E%2E/%2e%2e/secret.txt", "/..%2fsecret.txt"] {
        let (status, body) = with_timeout(get(addr, path)).await;
        assert_ne!(status, 200, "{path}");
        assert!(!body.contains("top-secret-value"), "{path}");
    }

    with_timeout(handle.stop()).await.unwrap();
}

#[tokio::test]
async fn event_stream_receives_signals_and_is_dropped_on_stop() {
    init_tracing();
    let project = project();
    let (handle, broadcaster) = start(&project).await;

    let mut stream = TcpStream::connect(handle.addr()).await.unwrap();
    stream
        .write_all(b"GET /__pageflow/events HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n")
        .await
        .unwrap();

    with_timeout(async {
        while broadcaster.client_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    broadcaster.notify_changed(&["/assets/styles/main.css".to_string()]);

    let received = with_timeout(async {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "event stream closed early");
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).into_owned();
            if text.contains(r#""type":"css""#) {
                return text;
            }
        }
    })
    .await;
    assert!(received.contains("text/event-stream"));
    assert!(received.contains(r#"data: {"type":"css","paths":["/assets/styles/main.css"]}"#));

    with_timeout(handle.stop()).await.unwrap();
    assert_eq!(broadcaster.client_count(), 0);
}

/// Read from `stream` until the accumulated text contains `needle`.
async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "stream closed before {needle:?} arrived");
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).into_owned();
        if text.contains(needle) {
            return text;
        }
    }
}

fn mock_ctx(fs: &MockFileSystem, broadcaster: &Arc<ReloadBroadcaster>) -> TaskContext {
    TaskContext::new("/p", Arc::new(fs.clone()), ParallelPolicy::WaitAll)
        .with_reloader(Arc::clone(broadcaster))
}

fn copy_task(name: &str, pattern: &str) -> Arc<LeafTask> {
    Arc::new(
        LeafTask::builder(name)
            .source(SourceSpec::new([pattern], "src").unwrap())
            .transform(Arc::new(Passthrough::new("copy")))
            .dest("temp")
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn stylesheet_only_rebuild_injects_css() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/assets/styles/main.css", "body{}");
    let broadcaster = Arc::new(ReloadBroadcaster::new());
    let (_id, mut browser) = broadcaster.register_client();

    copy_task("style", "src/assets/styles/*.css")
        .run(mock_ctx(&fs, &broadcaster))
        .await
        .unwrap();

    let signal = with_timeout(browser.recv()).await.unwrap();
    assert_eq!(signal, r#"{"type":"css","paths":["/assets/styles/main.css"]}"#);
    assert!(fs.exists(Path::new("/p/temp/assets/styles/main.css")));
}

#[tokio::test]
async fn page_rebuild_requests_full_reload() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/index.html", "<p>hi</p>");
    fs.add_file("/p/src/about.html", "<p>about</p>");
    let broadcaster = Arc::new(ReloadBroadcaster::new());
    let (_id, mut browser) = broadcaster.register_client();

    copy_task("page", "src/*.html")
        .run(mock_ctx(&fs, &broadcaster))
        .await
        .unwrap();

    let signal = with_timeout(browser.recv()).await.unwrap();
    assert_eq!(signal, r#"{"type":"reload"}"#);
    assert!(browser.try_recv().is_err(), "one signal per run");
}

#[tokio::test]
async fn rebuild_without_outputs_sends_nothing() {
    init_tracing();
    let fs = MockFileSystem::new();
    let broadcaster = Arc::new(ReloadBroadcaster::new());
    let (_id, mut browser) = broadcaster.register_client();

    copy_task("page", "src/*.html")
        .run(mock_ctx(&fs, &broadcaster))
        .await
        .unwrap();
    assert!(matches!(browser.try_recv(), Err(mpsc::error::TryRecvError::Empty)));
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn connect(addr: SocketAddr) -> TcpStream {
    loop {
        if let Ok(stream) = TcpStream::connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn serve_reloads_browsers_on_watched_change_and_stops_on_shutdown() {
    init_tracing();
    let project = project();
    let port = free_port();
    let serve = Arc::new(ServeTask::new(
        "serve",
        server_options(project.root(), port),
        WatchOptions {
            debounce: Duration::from_millis(50),
            use_hash: false,
        },
        vec![(WatchBinding::new("html", ["src/*.html"]).unwrap(), WatchAction::Reload)],
    ));
    let ctx = TaskContext::new(project.root(), Arc::new(RealFileSystem), ParallelPolicy::WaitAll);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let running = {
        let serve = Arc::clone(&serve);
        tokio::spawn(async move {
            serve
                .serve_until(ctx, async move {
                    let _ = stop_rx.await;
                })
                .await
        })
    };

    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    let (status, body) = with_timeout(async {
        connect(addr).await;
        get(addr, "/").await
    })
    .await;
    assert_eq!(status, 200);
    assert!(body.contains("<h1>temp</h1>"));

    let mut events = with_timeout(connect(addr)).await;
    events
        .write_all(b"GET /__pageflow/events HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n")
        .await
        .unwrap();
    // Lets the session register and the watcher settle.
    tokio::time::sleep(Duration::from_millis(300)).await;

    project.write("src/index.html", "<html><body>edited</body></html>");
    let received = with_timeout(read_until(&mut events, r#"data: {"type":"reload"}"#)).await;
    assert!(received.contains(r#"{"type":"reload"}"#));

    stop_tx.send(()).unwrap();
    with_timeout(running).await.unwrap().unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}
