//! Job server tests
//!
//! A real listener on an ephemeral port, a wiremock site to crawl and an
//! in-memory store to check what the accepted jobs wrote.

use hostwatch::config::{Config, ServerConfig};
use hostwatch::crawler::{Pipeline, StaticResolver};
use hostwatch::server::JobServer;
use hostwatch::storage::{SqliteStorage, Storage};
use serde_json::Value;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct RunningServer {
    addr: SocketAddr,
    store: Arc<Mutex<SqliteStorage>>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start_server(max_request_bytes: usize) -> RunningServer {
    let mut config = Config::with_database(":memory:");
    config.fetcher.retry_delay_ms = 10;

    let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let pipeline = Pipeline::new(config, store.clone())
        .unwrap()
        .with_resolver(StaticResolver::new().with("bb.com", Ipv4Addr::new(2, 2, 2, 2)));

    let server_config = ServerConfig {
        bind: "127.0.0.1:0".to_string(),
        max_concurrent_jobs: 2,
        max_request_bytes,
    };
    let listener = TcpListener::bind(&server_config.bind).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = JobServer::new(pipeline, &server_config);

    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = stopped.await;
            })
            .await
    });

    RunningServer {
        addr,
        store,
        stop,
        handle,
    }
}

async fn connect(addr: SocketAddr) -> (BufReader<OwnedReadHalf>, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, write_half) = stream.into_split();
    (BufReader::new(read_half), write_half)
}

async fn request(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    line: &str,
) -> Value {
    writer.write_all(line.as_bytes()).await.unwrap();
    writer.write_all(b"\n").await.unwrap();

    let mut response = String::new();
    reader.read_line(&mut response).await.unwrap();
    serde_json::from_str(&response).unwrap()
}

#[tokio::test]
async fn test_accepts_job_and_runs_it() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="http://bb.com/x">x</a>"#))
        .mount(&site)
        .await;

    let server = start_server(64 * 1024).await;
    let (mut reader, mut writer) = connect(server.addr).await;

    let body = serde_json::json!({ "urls": [site.uri(), format!("{}/other", site.uri())] });
    let response = request(&mut reader, &mut writer, &body.to_string()).await;

    assert_eq!(response["status"], "accepted");
    assert_eq!(response["job_id"], 1);
    assert_eq!(response["urls"], 2);

    // Shutdown waits for accepted jobs to finish
    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();

    let store = server.store.lock().unwrap();
    assert_eq!(store.count_urls().unwrap(), 2);
    assert_eq!(
        store.get_domain_ip("bb.com", "2.2.2.2").unwrap().unwrap().counter,
        2
    );
}

#[tokio::test]
async fn test_job_ids_increase_per_request() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&site)
        .await;

    let server = start_server(64 * 1024).await;
    let (mut reader, mut writer) = connect(server.addr).await;

    let body = serde_json::json!({ "urls": [site.uri()] }).to_string();
    let first = request(&mut reader, &mut writer, &body).await;
    let second = request(&mut reader, &mut writer, &body).await;

    assert_eq!(first["job_id"], 1);
    assert_eq!(second["job_id"], 2);

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_rejects_bad_requests() {
    let server = start_server(64 * 1024).await;
    let (mut reader, mut writer) = connect(server.addr).await;

    for (line, expected) in [
        ("not json", "Malformed JSON"),
        (r#"{"seeds": ["http://a.com"]}"#, "Missing 'urls' field"),
        (r#"{"urls": "http://a.com"}"#, "'urls' must be an array of strings"),
        (r#"{"urls": []}"#, "'urls' must not be empty"),
    ] {
        let response = request(&mut reader, &mut writer, line).await;
        assert_eq!(response["status"], "error", "for {}", line);
        let message = response["message"].as_str().unwrap();
        assert!(message.contains(expected), "{} should mention {}", message, expected);
    }

    // The connection stays usable after rejections
    let response = request(&mut reader, &mut writer, r#"{"urls": ["mailto:x@y.z"]}"#).await;
    assert_eq!(response["status"], "accepted");

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();

    let store = server.store.lock().unwrap();
    assert_eq!(store.count_urls().unwrap(), 0);
}

#[tokio::test]
async fn test_rejects_oversized_request() {
    let server = start_server(32).await;
    let (mut reader, mut writer) = connect(server.addr).await;

    let long = format!(r#"{{"urls": ["http://{}.com"]}}"#, "a".repeat(64));
    let response = request(&mut reader, &mut writer, &long).await;

    assert_eq!(response["status"], "error");
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("Request too large"));

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}
