//! Backend hot swap under live traffic.

mod common;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use common::{start_gateway, start_mock_upstream};
use gateway_core::cache::{BackendRegistry, CacheKind};
use gateway_core::config::PluginDataWatcher;
use gateway_core::http::X_CACHE_STATUS;
use gateway_core::plugin::{CacheDispatcher, DispatchOutcome, PluginData, PluginDataSubscriber, CACHE_PLUGIN};

fn event(config: &str) -> PluginData {
    PluginData::new(CACHE_PLUGIN, true, Some(config))
}

#[tokio::test]
async fn test_requests_keep_flowing_while_backends_swap() {
    let upstream = start_mock_upstream("payload", "text/plain").await;
    let gateway = start_gateway(upstream.addr).await;
    let dispatcher = CacheDispatcher::new(gateway.ctx.active_cache().clone(), BackendRegistry::with_defaults());
    dispatcher.apply(&event(r#"{"cacheType":"memory"}"#));

    let client = reqwest::Client::new();
    let mut readers = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        let url = gateway.url(&format!("/r/{}", i % 3));
        readers.push(tokio::spawn(async move {
            for _ in 0..20 {
                let resp = client.get(&url).send().await.unwrap();
                assert_eq!(resp.status(), 200);
                let body = resp.text().await.unwrap();
                assert!(body.starts_with("payload#"), "unexpected body {body}");
            }
        }));
    }

    for wait in 1..=10u64 {
        let outcome = dispatcher.apply(&event(&format!(r#"{{"cacheType":"memory","maxWait":{wait}}}"#)));
        assert!(matches!(outcome, DispatchOutcome::Installed { .. }));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    for reader in readers {
        reader.await.unwrap();
    }

    let snapshot = gateway.ctx.cache_snapshot().unwrap();
    assert_eq!(snapshot.generation(), 11);
    assert_eq!(snapshot.config().max_wait, 10);
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_swap_starts_with_empty_cache() {
    let upstream = start_mock_upstream("v", "text/plain").await;
    let gateway = start_gateway(upstream.addr).await;
    let dispatcher = CacheDispatcher::new(gateway.ctx.active_cache().clone(), BackendRegistry::with_defaults());
    let client = reqwest::Client::new();

    dispatcher.apply(&event(r#"{"cacheType":"memory"}"#));
    client.get(gateway.url("/a")).send().await.unwrap();
    let hit = client.get(gateway.url("/a")).send().await.unwrap();
    assert_eq!(hit.headers()[X_CACHE_STATUS], "HIT");

    // Re-delivering the same config keeps the populated backend.
    assert_eq!(
        dispatcher.apply(&event(r#"{"cacheType":"memory"}"#)),
        DispatchOutcome::Unchanged { generation: 1 }
    );
    let still_hit = client.get(gateway.url("/a")).send().await.unwrap();
    assert_eq!(still_hit.headers()[X_CACHE_STATUS], "HIT");

    // A different config installs a fresh backend; old entries are gone.
    dispatcher.apply(&event(r#"{"cacheType":"memory","maxActive":2}"#));
    let miss = client.get(gateway.url("/a")).send().await.unwrap();
    assert_eq!(miss.headers()[X_CACHE_STATUS], "MISS");
    assert_eq!(miss.text().await.unwrap(), "v#2");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_redis_degrades_to_miss() {
    let upstream = start_mock_upstream("fresh", "text/plain").await;
    let gateway = start_gateway(upstream.addr).await;
    let dispatcher = CacheDispatcher::new(gateway.ctx.active_cache().clone(), BackendRegistry::with_defaults());

    let outcome = dispatcher.apply(&event(r#"{"cacheType":"redis","url":"127.0.0.1:1","maxWait":200}"#));
    assert_eq!(outcome, DispatchOutcome::Installed { generation: 1 });
    assert_eq!(gateway.ctx.cache_snapshot().unwrap().backend().kind(), CacheKind::Redis);

    let client = reqwest::Client::new();
    for expected in ["fresh#1", "fresh#2"] {
        let resp = client.get(gateway.url("/r")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[X_CACHE_STATUS], "MISS");
        assert_eq!(resp.text().await.unwrap(), expected);
    }

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_plugin_data_file_drives_installs() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"name":"cache","enabled":true,"config":"{{\"cacheType\":\"memory\"}}"}},
            {{"name":"cache","enabled":true,"config":"{{\"cacheType\":\"memory\"}}"}},
            {{"name":"cache","enabled":true,"config":"not json"}},
            {{"name":"cache","enabled":false,"config":"{{\"cacheType\":\"redis\",\"url\":\"cache:6379\"}}"}},
            {{"name":"rewrite","enabled":true}}
        ]"#
    )
    .unwrap();

    let upstream = start_mock_upstream("unused", "text/plain").await;
    let gateway = start_gateway(upstream.addr).await;

    let dispatcher = CacheDispatcher::new(gateway.ctx.active_cache().clone(), BackendRegistry::with_defaults());
    let mut subscriber = PluginDataSubscriber::new();
    subscriber.register(Arc::new(dispatcher));

    let (watcher, events) = PluginDataWatcher::new(file.path());
    assert_eq!(watcher.publish_current(), 5);
    drop(watcher);

    subscriber.run(events, gateway.shutdown.subscribe()).await;

    let snapshot = gateway.ctx.cache_snapshot().unwrap();
    assert_eq!(snapshot.generation(), 1);
    assert_eq!(snapshot.backend().kind(), CacheKind::Memory);

    gateway.shutdown.trigger();
}
