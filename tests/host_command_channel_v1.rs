#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use moodflow::MoodFlowConfig;
use moodflow::face::FixedSequenceFaceEstimator;
use moodflow::host::contract::{
    CommandEnvelope, CommandName, EVENT_CRISIS_ESCALATED, EVENT_MOOD_DETECTED, EVENT_VERSION,
    ResponseEnvelope,
};
use moodflow::host::router::{HostCommandClient, MoodFlowServices, ServiceParts, command_channel};
use moodflow::language::FixedLocale;
use moodflow::{Mood, MoodEstimate};
use serde_json::json;

fn start() -> HostCommandClient {
    let mut config = MoodFlowConfig::default();
    config.language.geo_enabled = false;
    let mut parts = ServiceParts::in_memory(&config);
    parts.device = Arc::new(FixedLocale(Some("es_ES.UTF-8".into())));
    parts.face = Some(Arc::new(FixedSequenceFaceEstimator::always(
        MoodEstimate::new(Mood::Stressed, 90),
    )));
    let services = Arc::new(MoodFlowServices::new(config, parts));
    let (client, server) = command_channel(16, 64, services);
    tokio::spawn(server.run());
    client
}

async fn send(
    client: &HostCommandClient,
    id: &str,
    command: CommandName,
    payload: serde_json::Value,
) -> ResponseEnvelope {
    client
        .send(CommandEnvelope::new(id, command, payload))
        .await
        .expect("dispatch")
}

#[tokio::test]
async fn version_reports_contract() {
    let client = start();
    let resp = send(&client, "v", CommandName::HostVersion, json!({})).await;
    assert!(resp.ok);
    assert_eq!(resp.v, EVENT_VERSION);
    assert_eq!(resp.payload["contract_version"], EVENT_VERSION);
    assert_eq!(resp.payload["channel"], "moodflow_host_v1");
}

#[tokio::test]
async fn detect_with_frame_fuses_and_localizes() {
    let client = start();
    let mut events = client.subscribe_events();

    let resp = send(
        &client,
        "d1",
        CommandName::MoodDetect,
        json!({
            "user_id": "maria",
            "text": "so stressed, anxious and worried",
            "image_data": tiny_png_base64(),
            "use_webcam": true
        }),
    )
    .await;
    assert!(resp.ok, "{resp:?}");
    assert_eq!(resp.request_id, "d1");
    // text stressed 95 + face stressed 90: (57 + 36) * 1.1 = 102.3 → capped 95.
    assert_eq!(resp.payload["mood"], "stressed");
    assert_eq!(resp.payload["confidence"], 95);
    assert_eq!(resp.payload["sources"]["face"]["confidence"], 90);
    // Device locale is the first rung that answers for a fresh user.
    assert_eq!(resp.payload["resolved_language"]["code"], "es");
    assert_eq!(resp.payload["resolved_language"]["source"], "device");

    let event = events.recv().await.unwrap();
    assert_eq!(event.event, EVENT_MOOD_DETECTED);
    assert_eq!(event.payload["user_id"], "maria");
}

#[tokio::test]
async fn repeated_stress_raises_escalation_event() {
    let client = start();
    let mut events = client.subscribe_events();

    for i in 0..3 {
        let resp = send(
            &client,
            &format!("d{i}"),
            CommandName::MoodDetect,
            json!({"user_id": "sam", "text": "so stressed, anxious and worried"}),
        )
        .await;
        assert!(resp.ok);
    }

    let mut escalations = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.event == EVENT_CRISIS_ESCALATED {
            escalations.push(event);
        }
    }
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].payload["reasons"], json!(["streak"]));
    assert_eq!(escalations[0].payload["negative_mood_streak"], 3);
}

#[tokio::test]
async fn unknown_task_is_an_error_envelope_not_a_dispatch_failure() {
    let client = start();
    let resp = send(
        &client,
        "t1",
        CommandName::TasksComplete,
        json!({"task_id": "missing"}),
    )
    .await;
    assert!(!resp.ok);
    assert_eq!(resp.request_id, "t1");
    assert_eq!(resp.error.as_deref(), Some("not found: task missing"));
}

#[tokio::test]
async fn history_respects_limit() {
    let client = start();
    for i in 0..4 {
        send(
            &client,
            &format!("d{i}"),
            CommandName::MoodDetect,
            json!({"user_id": "lee", "text": "okay"}),
        )
        .await;
    }
    let resp = send(
        &client,
        "h",
        CommandName::MoodHistory,
        json!({"user_id": "lee", "limit": 2}),
    )
    .await;
    assert_eq!(resp.payload["entries"].as_array().unwrap().len(), 2);

    let bad = send(
        &client,
        "h2",
        CommandName::MoodHistory,
        json!({"user_id": "lee", "limit": 0}),
    )
    .await;
    assert!(!bad.ok);
}

fn tiny_png_base64() -> String {
    use base64::Engine as _;
    use std::io::Cursor;

    let image = image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
