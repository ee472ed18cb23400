//! Unit tests for the laps paginator

use jolpica_f1_client::client::{ClientError, LapsProgress};
use jolpica_f1_client::{laps_from_envelope, ClientConfig, JolpicaClient};
use serde_json::{json, Value};

use crate::support::scripted_transport::*;

fn lap_numbers(envelope: &Value) -> Vec<String> {
    laps_from_envelope(envelope)
        .unwrap()
        .into_iter()
        .map(|lap| lap.number)
        .collect()
}

fn probe_with_drivers(total: &str, drivers: usize) -> String {
    let timings: Vec<Value> = (1..=drivers)
        .map(|p| json!({"driverId": format!("d{p}"), "position": p.to_string(), "time": "1:30.000"}))
        .collect();
    json!({"MRData": {"total": total, "RaceTable": {"Races": [{
        "raceName": "Test Grand Prix",
        "Laps": [{"number": "1", "Timings": timings}]
    }]}}})
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn test_full_race_is_reassembled() {
    let server = LapsServer::new(22, 20);
    let client = test_client(server.clone());

    let envelope = client.laps("2024", 5).await.unwrap();

    let numbers = lap_numbers(&envelope);
    let expected: Vec<String> = (1..=22).map(|n| n.to_string()).collect();
    assert_eq!(numbers, expected);
    assert_eq!(envelope["MRData"]["total"], "440");

    let race = &envelope["MRData"]["RaceTable"]["Races"][0];
    assert_eq!(race["raceName"], "Miami Grand Prix");
    assert_eq!(envelope["MRData"]["RaceTable"]["season"], "2024");
    assert_eq!(envelope["MRData"]["series"], "f1");
    for lap in laps_from_envelope(&envelope).unwrap() {
        assert_eq!(lap.timings.len(), 20);
    }

    // Probe plus five pages of 100 rows
    let calls = server.calls();
    assert_eq!(calls.len(), 6);
    assert_eq!(calls[0].param("limit"), Some("1"));
    assert_eq!(calls[0].param("offset"), Some("0"));
    let offsets: Vec<&str> = calls[1..]
        .iter()
        .map(|call| call.param("offset").unwrap())
        .collect();
    assert_eq!(offsets, vec!["0", "100", "200", "300", "400"]);
    assert!(calls.iter().all(|call| call.url.ends_with("/2024/5/laps")));
    assert!(calls[1..].iter().all(|call| call.param("limit") == Some("100")));
}

#[tokio::test(start_paused = true)]
async fn test_lap_split_across_pages_is_joined() {
    // 19 drivers: page one ends five rows into lap 6
    let server = LapsServer::new(10, 19);
    let client = test_client(server.clone());

    let envelope = client.laps("2024", 5).await.unwrap();
    let laps = laps_from_envelope(&envelope).unwrap();

    assert_eq!(laps.len(), 10);
    assert!(laps.iter().all(|lap| lap.timings.len() == 19));
    assert_eq!(laps[5].number, "6");
    assert_eq!(envelope["MRData"]["total"], "190");
    assert_eq!(server.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_probe_without_race_is_returned_verbatim() {
    let probe = json!({"MRData": {
        "total": "0",
        "limit": "1",
        "offset": "0",
        "RaceTable": {"season": "2030", "round": "1", "Races": []}
    }});
    let transport = ScriptedTransport::new(vec![ok(probe.to_string())]);
    let client = test_client(transport.clone());

    let envelope = client.laps("2030", 1).await.unwrap();

    assert_eq!(envelope, probe);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_page_ends_pagination() {
    let empty_page = json!({"MRData": {"total": "200", "RaceTable": {"Races": [{"Laps": []}]}}});
    let transport = ScriptedTransport::new(vec![
        ok(probe_with_drivers("200", 20)),
        ok(empty_page.to_string()),
    ]);
    let client = test_client(transport.clone());

    let envelope = client.laps("2024", 3).await.unwrap();

    assert!(lap_numbers(&envelope).is_empty());
    assert_eq!(envelope["MRData"]["total"], "0");
    assert_eq!(
        envelope["MRData"]["RaceTable"]["Races"][0]["raceName"],
        "Test Grand Prix"
    );
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_page_without_structure_ends_pagination() {
    let first_page = probe_with_drivers("60", 20);
    let transport = ScriptedTransport::new(vec![
        ok(probe_with_drivers("60", 20)),
        ok(first_page),
        ok(json!({"MRData": {"total": "60"}}).to_string()),
    ]);
    let client = JolpicaClient::with_transport(
        ClientConfig {
            page_size: 20,
            ..test_config()
        },
        transport.clone(),
    )
    .unwrap();

    let envelope = client.laps("2024", 3).await.unwrap();

    // Kept what arrived before the broken page
    assert_eq!(lap_numbers(&envelope), vec!["1".to_string()]);
    assert_eq!(envelope["MRData"]["total"], "20");
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_probe_without_timings_assumes_twenty_drivers() {
    let probe = json!({"MRData": {"total": "40", "RaceTable": {"Races": [{"Laps": []}]}}});
    let page = json!({"MRData": {"total": "40", "RaceTable": {"Races": [{"Laps": [
        {"number": "1", "Timings": []},
        {"number": "2", "Timings": []}
    ]}]}}});
    let transport = ScriptedTransport::new(vec![ok(probe.to_string()), ok(page.to_string())]);
    let client = test_client(transport.clone());

    let envelope = client.laps("2024", 8).await.unwrap();

    assert_eq!(lap_numbers(&envelope), vec!["1", "2"]);
    assert_eq!(envelope["MRData"]["total"], "40");
}

#[tokio::test(start_paused = true)]
async fn test_page_error_propagates() {
    let transport = ScriptedTransport::new(vec![
        ok(probe_with_drivers("400", 20)),
        status(500),
    ]);
    let client = JolpicaClient::with_transport(
        ClientConfig {
            max_retries: 1,
            ..test_config()
        },
        transport,
    )
    .unwrap();

    let err = client.laps("2024", 5).await.unwrap_err();
    assert!(matches!(err, ClientError::Exhausted { attempts: 1, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_probe_error_propagates() {
    let transport = ScriptedTransport::repeating(connect_error());
    let client = JolpicaClient::with_transport(
        ClientConfig {
            max_retries: 2,
            ..test_config()
        },
        transport.clone(),
    )
    .unwrap();

    let err = client.laps("2024", 5).await.unwrap_err();
    assert!(matches!(err, ClientError::Network { attempts: 2, .. }));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_second_fetch_is_served_from_cache() {
    let server = LapsServer::new(12, 20);
    let client = test_client(server.clone());

    let first = client.laps("2024", 5).await.unwrap();
    let calls_after_first = server.call_count();
    let second = client.laps("2024", 5).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(server.call_count(), calls_after_first);
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_reported_per_page() {
    let server = LapsServer::new(22, 20);
    let client = test_client(server);
    let mut seen: Vec<LapsProgress> = Vec::new();

    client
        .laps_paginator()
        .fetch_laps_with_progress("2024", 5, &mut |progress| seen.push(progress))
        .await
        .unwrap();

    assert_eq!(seen.len(), 5);
    assert!(seen.iter().all(|p| p.total_pages == 5 && p.total_laps == 22));
    assert_eq!(seen.last().map(|p| p.laps_fetched), Some(22));
    assert_eq!(seen.first().map(|p| p.page), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_path_like_season_is_rejected_before_any_request() {
    let transport = ScriptedTransport::repeating(ok(envelope("20")));
    let client = test_client(transport.clone());

    let err = client.laps("2024/../x", 5).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidSeason(ref s) if s == "2024/../x"));

    let err = client
        .laps_paginator()
        .fetch_laps("../2024", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidSeason(_)));

    assert!(client.results("24", 1).await.is_err());
    assert_eq!(transport.call_count(), 0);
}
