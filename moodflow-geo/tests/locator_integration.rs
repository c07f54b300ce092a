//! Integration tests for the multi-provider locator against mock HTTP servers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;

use moodflow_geo::{
    CircuitBreakerConfig, CircuitState, GeoConfig, GeoError, GeoLocator, GeoProvider,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_answering(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn config_for(servers: &[(GeoProvider, &MockServer)], cache_ttl_seconds: u64) -> GeoConfig {
    let endpoint_overrides: HashMap<GeoProvider, String> = servers
        .iter()
        .map(|(provider, server)| (*provider, format!("{}/json/", server.uri())))
        .collect();
    GeoConfig {
        providers: servers.iter().map(|(p, _)| *p).collect(),
        endpoint_overrides,
        timeout_seconds: 2,
        cache_ttl_seconds,
        user_agent: Some("MoodFlowTest/1.0".into()),
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 2,
            cooldown_secs: 600,
        },
    }
}

#[tokio::test]
async fn highest_priority_success_wins() {
    let first = server_answering(200, serde_json::json!({"country_code": "IN"})).await;
    let second = server_answering(
        200,
        serde_json::json!({"status": "success", "countryCode": "ES"}),
    )
    .await;

    let locator = GeoLocator::new(config_for(
        &[(GeoProvider::IpApiCo, &first), (GeoProvider::IpApiCom, &second)],
        0,
    ))
    .unwrap();

    let country = locator.lookup_country().await.unwrap();
    assert_eq!(country.as_str(), "IN");
}

#[tokio::test]
async fn falls_back_when_primary_fails() {
    let failing = server_answering(
        200,
        serde_json::json!({"error": true, "reason": "RateLimited"}),
    )
    .await;
    let backup = server_answering(
        200,
        serde_json::json!({"success": true, "country_code": "ae"}),
    )
    .await;

    let locator = GeoLocator::new(config_for(
        &[(GeoProvider::IpApiCo, &failing), (GeoProvider::IpWhoIs, &backup)],
        0,
    ))
    .unwrap();

    let country = locator.lookup_country().await.unwrap();
    assert_eq!(country.as_str(), "AE");
}

#[tokio::test]
async fn all_failing_returns_all_providers_failed() {
    let a = server_answering(500, serde_json::json!({})).await;
    let b = server_answering(200, serde_json::json!({"success": false, "message": "reserved range"})).await;

    let locator = GeoLocator::new(config_for(
        &[(GeoProvider::IpApiCo, &a), (GeoProvider::IpWhoIs, &b)],
        0,
    ))
    .unwrap();

    let err = locator.lookup_country().await.unwrap_err();
    assert!(matches!(err, GeoError::AllProvidersFailed(_)));
    let message = err.to_string();
    assert!(message.contains("ipapi.co"));
    assert!(message.contains("ipwho.is"));
}

#[tokio::test]
async fn cached_answer_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"country_code": "CN"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let locator =
        GeoLocator::new(config_for(&[(GeoProvider::IpApiCo, &server)], 600)).unwrap();

    assert_eq!(locator.lookup_country().await.unwrap().as_str(), "CN");
    assert_eq!(locator.lookup_country().await.unwrap().as_str(), "CN");
    // `expect(1)` is verified when the server drops.
}

#[tokio::test]
async fn repeated_failures_open_the_circuit() {
    let server = server_answering(503, serde_json::json!({})).await;
    let locator =
        GeoLocator::new(config_for(&[(GeoProvider::IpApiCo, &server)], 0)).unwrap();

    for _ in 0..2 {
        assert!(locator.lookup_country().await.is_err());
    }
    assert_eq!(
        locator.provider_health(),
        vec![(GeoProvider::IpApiCo, CircuitState::Open)]
    );

    let err = locator.lookup_country().await.unwrap_err();
    assert!(err.to_string().contains("circuit is open"));
}

#[tokio::test]
async fn benched_provider_recovers_through_a_trial_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"country_code": "IN"})),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&[(GeoProvider::IpApiCo, &server)], 0);
    config.circuit_breaker = CircuitBreakerConfig {
        failure_threshold: 1,
        cooldown_secs: 0,
    };
    let locator = GeoLocator::new(config).unwrap();

    assert!(locator.lookup_country().await.is_err());
    assert_eq!(
        locator.provider_health(),
        vec![(GeoProvider::IpApiCo, CircuitState::Open)]
    );

    assert_eq!(locator.lookup_country().await.unwrap().as_str(), "IN");
    assert_eq!(
        locator.provider_health(),
        vec![(GeoProvider::IpApiCo, CircuitState::Closed)]
    );
}
