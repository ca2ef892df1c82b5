mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{engine_with_client, money, seed_balance, stock};
use purchase_engine::domain::{AccountId, Advisory};
use purchase_engine::notifier::{
    DispatchAdapter, HttpNotifierClient, NotificationError, NotificationRequest, NotifierClient,
    NotifierError,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/api/v1/notifications";

fn client(server: &MockServer, timeout: Duration) -> HttpNotifierClient {
    HttpNotifierClient::new(&server.uri(), timeout).unwrap()
}

fn adapter(server: &MockServer) -> DispatchAdapter {
    DispatchAdapter::new(
        Arc::new(client(server, Duration::from_secs(2))),
        Duration::from_secs(2),
    )
}

#[tokio::test]
async fn dispatch_posts_notification_json() {
    let server = MockServer::start().await;
    let id = AccountId::new();

    Mock::given(method("POST"))
        .and(path(API))
        .and(body_json(json!({
            "userId": id.to_string(),
            "subject": "Hello",
            "body": "World",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    adapter(&server).dispatch(id, "Hello", "World").await.unwrap();
}

#[tokio::test]
async fn non_2xx_send_is_a_dispatch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let failed = adapter(&server)
        .dispatch(AccountId::new(), "s", "b")
        .await
        .unwrap_err();
    assert!(failed.reason.contains("500"));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let result = client(&server, Duration::from_millis(50))
        .send(NotificationRequest {
            user_id: AccountId::new(),
            subject: "s".to_string(),
            body: "b".to_string(),
        })
        .await;
    assert!(matches!(result, Err(NotifierError::Timeout)));
}

#[tokio::test]
async fn preferences_round_trip_through_the_api() {
    let server = MockServer::start().await;
    let id = AccountId::new();

    Mock::given(method("POST"))
        .and(path(format!("{}/preferences", API)))
        .and(body_json(json!({
            "userId": id.to_string(),
            "notificationEnabled": true,
            "type": "EMAIL",
            "contactInfo": "alice@example.com",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/preferences", API)))
        .and(query_param("userId", id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pref-1",
            "type": "EMAIL",
            "enabled": true,
            "contactInfo": "alice@example.com",
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/preferences", API)))
        .and(query_param("userId", id.to_string()))
        .and(query_param("enabled", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "EMAIL",
            "enabled": false,
            "contactInfo": "alice@example.com",
        })))
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    adapter
        .upsert_preference(id, true, Some("alice@example.com".to_string()))
        .await
        .unwrap();

    let preference = adapter.get_preference(id).await.unwrap();
    assert!(preference.enabled);
    assert_eq!(preference.contact_info.as_deref(), Some("alice@example.com"));

    let changed = adapter.change_preference(id, false).await.unwrap();
    assert!(!changed.enabled);
}

#[tokio::test]
async fn toggling_without_stored_contact_never_reaches_the_api() {
    let server = MockServer::start().await;
    let id = AccountId::new();

    Mock::given(method("GET"))
        .and(path(format!("{}/preferences", API)))
        .and(query_param("userId", id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "EMAIL",
            "enabled": false,
            "contactInfo": " ",
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/preferences", API)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(
        adapter(&server).change_preference(id, true).await,
        Err(NotificationError::ContactInfoRequired)
    );
}

#[tokio::test]
async fn history_clear_and_retry_hit_their_endpoints() {
    let server = MockServer::start().await;
    let id = AccountId::new();

    Mock::given(method("GET"))
        .and(path(API))
        .and(query_param("userId", id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "subject": "Hi", "body": "there", "status": "FAILED" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(API))
        .and(query_param("userId", id.to_string()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(API))
        .and(query_param("userId", id.to_string()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    let history = adapter.history(id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "FAILED");

    adapter.clear_history(id).await.unwrap();
    adapter.retry_failed(id).await.unwrap();
}

#[tokio::test]
async fn client_errors_are_business_rejections_server_errors_are_unavailability() {
    let server = MockServer::start().await;
    let id = AccountId::new();

    Mock::given(method("GET"))
        .and(path(format!("{}/preferences", API)))
        .respond_with(ResponseTemplate::new(404).set_body_string("no preference"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    assert!(matches!(
        adapter.get_preference(id).await,
        Err(NotificationError::Rejected { status: 404, .. })
    ));
    assert!(matches!(
        adapter.clear_history(id).await,
        Err(NotificationError::Unavailable(_))
    ));
}

#[tokio::test]
async fn unreachable_notifier_is_unavailable() {
    let client =
        HttpNotifierClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
    let adapter = DispatchAdapter::new(Arc::new(client), Duration::from_secs(1));

    assert!(matches!(
        adapter.retry_failed(AccountId::new()).await,
        Err(NotificationError::Unavailable(_))
    ));
    assert!(adapter.dispatch(AccountId::new(), "s", "b").await.is_err());
}

#[tokio::test]
async fn purchase_survives_failing_remote_notifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/preferences", API)))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let engine = engine_with_client(
        Arc::new(client(&server, Duration::from_secs(2))),
        Duration::from_secs(2),
    );
    let alice = engine.register("alice").await.unwrap();
    let game = stock(&engine, "Portal", "10");
    engine.add_to_cart(alice, game).await.unwrap();
    seed_balance(&engine, alice, "101").await;

    let outcome = engine.purchase(alice).await.unwrap();

    assert!(outcome.is_committed());
    assert!(matches!(
        outcome.advisory(),
        Some(Advisory::PurchaseNotificationFailure(_))
    ));
    let account = engine.registry().account(alice).await.unwrap();
    assert_eq!(account.balance, money("91"));
    assert!(account.owns(&game));
}
