//! End-to-end tests for the poll engine.
//!
//! A wiremock server plays both the Waze feed and the chat webhook.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use waze_alerts::config::{CompiledWebhook, SecretString};
use waze_alerts::error::NotifyError;
use waze_alerts::{
    AllowPolicy, EngineSettings, Fetcher, MapLinks, MapService, NotificationMessage, Notifier,
    PollEngine, Shutdown, Source, StopReason, WebhookNotifier,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"{
    "alerts": [
        {"type": "HAZARD", "subtype": "HAZARD_ON_ROAD_POT_HOLE", "pubMillis": 1700000001000,
         "location": {"x": -74.0, "y": 40.7}, "reportRating": 3, "confidence": 1, "reliability": 7},
        {"type": "POLICE", "subtype": "POLICE_HIDING", "pubMillis": 1700000002000,
         "location": {"x": -74.1, "y": 40.8}},
        {"type": "ACCIDENT", "subtype": "ACCIDENT_MAJOR", "pubMillis": 1700000003000,
         "location": {"x": -74.2, "y": 40.9}, "reportRating": 5, "confidence": 2, "reliability": 9}
    ],
    "endTimeMillis": 1700000060000
}"#;

fn make_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to create client")
}

fn settings(policy: AllowPolicy, map_links: MapLinks) -> EngineSettings {
    EngineSettings {
        service_name: "Waze Alerts".to_string(),
        poll_interval: Duration::from_millis(50),
        policy,
        map_links,
    }
}

async fn mount_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "application/json"))
        .mount(server)
        .await;
}

async fn run_until(engine: PollEngine, after: Duration, reason: StopReason) -> StopReason {
    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        trigger.trigger(reason);
    });

    tokio::time::timeout(Duration::from_secs(10), engine.run(shutdown))
        .await
        .expect("engine should stop after shutdown")
}

fn webhook_titles(requests: &[wiremock::Request]) -> Vec<String> {
    requests
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| {
            let card: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            card["title"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

#[tokio::test]
async fn relays_allowed_alerts_between_service_notifications() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::from_config(
        "webhook",
        "Waze Alerts",
        &CompiledWebhook {
            url: SecretString::new(format!("{}/webhook", server.uri())),
            headers: BTreeMap::new(),
            body_template: None,
            theme_color: "0076D7".to_string(),
        },
        make_client(),
    )
    .unwrap();

    let policy = AllowPolicy::new(
        Some(vec!["HAZARD_ON_ROAD_POT_HOLE", "ACCIDENT_MAJOR"]),
        None,
    );
    let map_links = MapLinks::new(vec![MapService::new(
        "Google Maps",
        "https://maps.example/?q={y},{x}",
    )]);
    let fetcher = Fetcher::new(
        make_client(),
        vec![Source::new("city", format!("{}/feed", server.uri()))],
    );
    let engine = PollEngine::new(settings(policy, map_links), fetcher, Arc::new(notifier));

    let reason = run_until(engine, Duration::from_millis(400), StopReason::Interrupt).await;
    assert_eq!(reason, StopReason::Interrupt);

    let requests = server.received_requests().await.unwrap();

    // Several polls happened, but the watermark keeps repeats out
    let polls = requests.iter().filter(|r| r.method.as_str() == "GET").count();
    assert!(polls >= 2, "expected repeated polls, got {}", polls);

    assert_eq!(
        webhook_titles(&requests),
        vec!["Waze Alerts", "Pothole", "Major Accident", "Waze Alerts"]
    );

    let posts: Vec<serde_json::Value> = requests
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(posts[0]["text"], "Waze Alerts is now running.");
    assert_eq!(
        posts[1]["text"],
        "Rating: 3 | Confidence: 1 | Reliability: 7 | Coordinates: -74.0, 40.7 | \
         Map: [Google Maps](https://maps.example/?q=40.7,-74.0)"
    );
    assert_eq!(
        posts[3]["text"],
        "Waze Alerts has been stopped by keyboard interrupt."
    );
}

#[tokio::test]
async fn rejected_deliveries_do_not_stop_the_loop() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::from_config(
        "webhook",
        "Waze Alerts",
        &CompiledWebhook {
            url: SecretString::new(format!("{}/webhook", server.uri())),
            headers: BTreeMap::new(),
            body_template: None,
            theme_color: "0076D7".to_string(),
        },
        make_client(),
    )
    .unwrap();

    let fetcher = Fetcher::new(
        make_client(),
        vec![Source::new("city", format!("{}/feed", server.uri()))],
    );
    let engine = PollEngine::new(
        settings(AllowPolicy::unrestricted(), MapLinks::default()),
        fetcher,
        Arc::new(notifier),
    );

    let reason = run_until(engine, Duration::from_millis(300), StopReason::Terminate).await;
    assert_eq!(reason, StopReason::Terminate);

    let requests = server.received_requests().await.unwrap();
    // start + 3 alerts (each attempted once) + stop
    assert_eq!(webhook_titles(&requests).len(), 5);
}

/// Notifier that panics on anything but service notifications.
#[derive(Default)]
struct PanickingNotifier {
    sent: Mutex<Vec<NotificationMessage>>,
}

#[async_trait]
impl Notifier for PanickingNotifier {
    fn name(&self) -> &str {
        "panicking"
    }

    fn notifier_type(&self) -> &str {
        "test"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        if message.title != "Waze Alerts" {
            panic!("cannot deliver {}", message.title);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[tokio::test]
async fn panicking_cycle_is_contained() {
    let server = MockServer::start().await;
    mount_feed(&server).await;

    let notifier = Arc::new(PanickingNotifier::default());
    let fetcher = Fetcher::new(
        make_client(),
        vec![Source::new("city", format!("{}/feed", server.uri()))],
    );
    let engine = PollEngine::new(
        settings(AllowPolicy::unrestricted(), MapLinks::default()),
        fetcher,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );

    let reason = run_until(engine, Duration::from_millis(400), StopReason::Terminate).await;
    assert_eq!(reason, StopReason::Terminate);

    // Polling continued after the panic
    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() >= 2, "expected repeated polls, got {}", requests.len());

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].body, "Waze Alerts is now running.");
    assert_eq!(sent[1].body, "Waze Alerts has been stopped.");
}
