//! End-to-end pipeline tests
//!
//! These tests use wiremock to serve seed pages and run the whole
//! fetch → extract → resolve → aggregate → persist cycle against SQLite.

use hostwatch::config::Config;
use hostwatch::crawler::{Pipeline, StaticResolver};
use hostwatch::storage::{SqliteStorage, Storage};
use hostwatch::HostwatchError;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(db_path: &str) -> Config {
    let mut config = Config::with_database(db_path);
    config.fetcher.timeout_secs = 2;
    config.fetcher.max_retries = 2;
    config.fetcher.retry_delay_ms = 10;
    config
}

fn resolver() -> StaticResolver {
    StaticResolver::new()
        .with("vk.co", Ipv4Addr::new(1, 1, 1, 1))
        .with("bb.com", Ipv4Addr::new(2, 2, 2, 2))
}

async fn serve_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Address on which nothing is listening
fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_single_seed_two_links() {
    let server = MockServer::start().await;
    serve_page(
        &server,
        "/",
        r#"<a href="http://vk.co"></a><a href="http://bb.com"></a>"#,
    )
    .await;

    let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let pipeline = Pipeline::new(test_config(":memory:"), store.clone())
        .unwrap()
        .with_resolver(resolver());

    let seed = format!("{}/", server.uri());
    let report = pipeline.run(&[seed.clone()]).await.unwrap();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.links_extracted, 2);
    assert_eq!(report.incomplete_links, 0);
    assert_eq!(report.batches_persisted, 1);
    assert_eq!(report.persisted.records_persisted, 2);
    assert_eq!(report.persisted.links_created, 2);

    let store = store.lock().unwrap();
    assert_eq!(store.count_urls().unwrap(), 1);
    assert_eq!(store.count_domain_ips().unwrap(), 2);
    assert_eq!(store.count_links().unwrap(), 2);

    let url = store.get_url(&seed).unwrap().expect("seed url row");
    for (domain, ip) in [("vk.co", "1.1.1.1"), ("bb.com", "2.2.2.2")] {
        let record = store.get_domain_ip(domain, ip).unwrap().expect("domain_ip row");
        assert_eq!(record.counter, 1);
        assert_eq!(store.get_linked_url_ids(record.id).unwrap(), vec![url.id]);
    }
}

#[tokio::test]
async fn test_hrefs_without_authority_are_dropped() {
    let server = MockServer::start().await;
    serve_page(&server, "/", r#"<a href="vk.co"></a><a href="bb.com"></a>"#).await;

    let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let pipeline = Pipeline::new(test_config(":memory:"), store.clone())
        .unwrap()
        .with_resolver(resolver());

    let report = pipeline.run(&[server.uri()]).await.unwrap();

    assert_eq!(report.links_extracted, 2);
    assert_eq!(report.incomplete_links, 2);

    let store = store.lock().unwrap();
    assert_eq!(store.count_urls().unwrap(), 0);
    assert_eq!(store.count_domain_ips().unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_body_writes_nothing() {
    let server = MockServer::start().await;
    serve_page(&server, "/", r#"{"id":"1"}"#).await;

    let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let pipeline = Pipeline::new(test_config(":memory:"), store.clone())
        .unwrap()
        .with_resolver(resolver());

    let report = pipeline.run(&[server.uri()]).await.unwrap();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.links_extracted, 0);
    assert_eq!(report.batches_persisted, 0);

    let store = store.lock().unwrap();
    assert_eq!(store.count_urls().unwrap(), 0);
    assert_eq!(store.count_domain_ips().unwrap(), 0);
    assert_eq!(store.count_links().unwrap(), 0);
}

#[tokio::test]
async fn test_unreachable_seed_does_not_stop_others() {
    let server = MockServer::start().await;
    serve_page(&server, "/ok", r#"<a href="http://www.vk.co/feed">vk</a>"#).await;

    let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let pipeline = Pipeline::new(test_config(":memory:"), store.clone())
        .unwrap()
        .with_resolver(resolver());

    let dead = closed_address();
    let seeds = [dead.clone(), format!("{}/ok", server.uri()), "not a url".to_string()];
    let report = pipeline.run(&seeds).await.unwrap();

    assert_eq!(report.seeds_submitted, 3);
    assert_eq!(report.seeds_skipped, 1);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.fetch_failures, vec![dead]);

    let store = store.lock().unwrap();
    let record = store.get_domain_ip("vk.co", "1.1.1.1").unwrap().unwrap();
    assert_eq!(record.counter, 1);
    assert_eq!(store.count_urls().unwrap(), 1);
}

#[tokio::test]
async fn test_counters_accumulate_across_runs() {
    let server = MockServer::start().await;
    serve_page(
        &server,
        "/",
        r#"<a href="http://vk.co/1"></a><a href="http://vk.co/2"></a><a href="http://bb.com"></a>"#,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("hostwatch.db");
    let db = db_path.to_str().unwrap();

    for _ in 0..2 {
        let storage = SqliteStorage::new(&db_path).unwrap();
        let pipeline = Pipeline::new(test_config(db), Arc::new(Mutex::new(storage)))
            .unwrap()
            .with_resolver(resolver());
        pipeline.run(&[server.uri()]).await.unwrap();
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(
        storage.get_domain_ip("vk.co", "1.1.1.1").unwrap().unwrap().counter,
        4
    );
    assert_eq!(
        storage.get_domain_ip("bb.com", "2.2.2.2").unwrap().unwrap().counter,
        2
    );
    assert_eq!(storage.count_urls().unwrap(), 1);
    assert_eq!(storage.count_links().unwrap(), 2);
    assert_eq!(storage.total_counter().unwrap(), 6);
}

#[tokio::test]
async fn test_duplicate_seeds_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="http://bb.com"></a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let pipeline = Pipeline::new(test_config(":memory:"), store.clone())
        .unwrap()
        .with_resolver(resolver());

    let seeds = [server.uri(), format!("{}/", server.uri()), format!("{}/#frag", server.uri())];
    let report = pipeline.run(&seeds).await.unwrap();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(
        store
            .lock()
            .unwrap()
            .get_domain_ip("bb.com", "2.2.2.2")
            .unwrap()
            .unwrap()
            .counter,
        1
    );
}

#[tokio::test]
async fn test_unavailable_store_fails_the_run() {
    let server = MockServer::start().await;
    serve_page(&server, "/", r#"<a href="http://bb.com"></a>"#).await;

    let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));

    // Poison the lock so the persist step cannot acquire the store
    let poisoner = store.clone();
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.lock().unwrap();
        panic!("poison");
    })
    .join();

    let pipeline = Pipeline::new(test_config(":memory:"), store)
        .unwrap()
        .with_resolver(resolver());

    let err = pipeline.run(&[server.uri()]).await.unwrap_err();
    assert!(matches!(err, HostwatchError::Storage(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_share_one_counter() {
    let server = MockServer::start().await;
    let body: String = (0..20)
        .map(|i| format!(r#"<a href="http://bb.com/{}"></a>"#, i))
        .collect();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let store = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let mut runs = tokio::task::JoinSet::new();

    for n in 0..8 {
        let mut config = test_config(":memory:");
        config.pipeline.batch_size = 3;
        let pipeline = Pipeline::new(config, store.clone())
            .unwrap()
            .with_resolver(resolver());
        let seed = format!("{}/run/{}", server.uri(), n);
        runs.spawn(async move { pipeline.run(&[seed]).await });
    }

    while let Some(joined) = runs.join_next().await {
        let report = joined.unwrap().unwrap();
        assert_eq!(report.persisted.records_persisted, 7);
    }

    let store = store.lock().unwrap();
    let record = store.get_domain_ip("bb.com", "2.2.2.2").unwrap().unwrap();
    assert_eq!(record.counter, 160);
    assert_eq!(store.count_domain_ips().unwrap(), 1);
    assert_eq!(store.count_urls().unwrap(), 8);
    assert_eq!(store.count_links().unwrap(), 8);
}
