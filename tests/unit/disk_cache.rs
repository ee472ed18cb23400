//! Unit tests for the persistent cache as seen through the client

use chrono::Utc;
use jolpica_f1_client::cache::{CacheEntry, CacheStore, DiskCache, RequestKey};
use jolpica_f1_client::{ClientConfig, JolpicaClient};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

use crate::support::scripted_transport::*;

fn disk_config(dir: &TempDir, ttl_hours: Option<f64>) -> ClientConfig {
    ClientConfig {
        cache_dir: Some(dir.path().to_path_buf()),
        cache_ttl_hours: ttl_hours,
        ..test_config()
    }
}

#[tokio::test(start_paused = true)]
async fn test_responses_survive_client_restart() {
    let dir = TempDir::new().unwrap();

    let first = ScriptedTransport::repeating(ok(envelope("20")));
    let client = JolpicaClient::with_transport(disk_config(&dir, None), first.clone()).unwrap();
    client.qualifying("2024", 5).await.unwrap();
    assert_eq!(first.call_count(), 1);
    drop(client);

    let second = ScriptedTransport::repeating(ok(envelope("99")));
    let client = JolpicaClient::with_transport(disk_config(&dir, None), second.clone()).unwrap();
    let payload = client.qualifying("2024", 5).await.unwrap();

    assert_eq!(payload["MRData"]["total"], "20");
    assert_eq!(second.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_file_is_refetched() {
    let dir = TempDir::new().unwrap();
    let key = RequestKey::new(
        "2024/5/results",
        &[("season", "2024".to_string()), ("round", "5".to_string())],
    )
    .with_defaults();
    let stale = CacheEntry::created_at(
        json!({"MRData": {"total": "stale"}}),
        Utc::now() - chrono::Duration::hours(3),
    );
    CacheStore::disk(dir.path(), None)
        .unwrap()
        .put_entry(&key, &stale)
        .unwrap();

    let transport = ScriptedTransport::repeating(ok(envelope("fresh")));
    let client =
        JolpicaClient::with_transport(disk_config(&dir, Some(2.0)), transport.clone()).unwrap();
    let payload = client.results("2024", 5).await.unwrap();

    assert_eq!(payload["MRData"]["total"], "fresh");
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_file_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let key = RequestKey::new(
        "2024/5/pitstops",
        &[("season", "2024".to_string()), ("round", "5".to_string())],
    )
    .with_defaults();
    let disk = DiskCache::new(dir.path()).unwrap();
    fs::write(disk.path_for(&key), "{\"timestamp\": 12").unwrap();

    let transport = ScriptedTransport::repeating(ok(envelope("7")));
    let client =
        JolpicaClient::with_transport(disk_config(&dir, None), transport.clone()).unwrap();
    let payload = client.pitstops("2024", 5).await.unwrap();

    assert_eq!(payload["MRData"]["total"], "7");
    assert_eq!(transport.call_count(), 1);

    // The good response replaced the corrupt file
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(disk.path_for(&key)).unwrap()).unwrap();
    assert_eq!(raw["data"]["MRData"]["total"], "7");
}

#[tokio::test(start_paused = true)]
async fn test_clear_and_evict_through_client() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::repeating(ok(envelope("20")));
    let client =
        JolpicaClient::with_transport(disk_config(&dir, Some(1.0)), transport.clone()).unwrap();

    client.races("2024", 0).await.unwrap();
    client.driver_standings("2024", 0).await.unwrap();
    assert_eq!(client.executor().cache().len(), 2);

    assert_eq!(client.evict_expired().unwrap(), 0);
    assert_eq!(client.clear_cache().unwrap(), 2);
    assert!(client.executor().cache().is_empty());

    client.races("2024", 0).await.unwrap();
    assert_eq!(transport.call_count(), 3);
}
