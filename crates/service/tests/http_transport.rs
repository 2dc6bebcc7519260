use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use models::{CollectionKey, Group, ItemId, Operator};
use serde_json::{json, Value};
use service::retry::RetryPolicy;
use service::transport::{HttpOnoTransport, OnoTransport};
use service::{RemoteCollectionStore, StoreError};
use tokio::net::TcpListener;

/// In-process stand-in for the ONO gRPC gateway.
#[derive(Clone, Default)]
struct FakeOno {
    blobs: Arc<Mutex<HashMap<(String, String), String>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    fail_status: Arc<Mutex<Option<u16>>>,
}

impl FakeOno {
    fn record(&self, headers: HeaderMap) -> Result<(), (StatusCode, String)> {
        self.headers.lock().unwrap().push(headers);
        match *self.fail_status.lock().unwrap() {
            Some(code) => Err((StatusCode::from_u16(code).unwrap(), "upstream unavailable".into())),
            None => Ok(()),
        }
    }
}

fn key_of(body: &Value) -> (String, String) {
    (
        body["appCode"].as_str().unwrap_or_default().to_string(),
        body["dataName"].as_str().unwrap_or_default().to_string(),
    )
}

async fn get_app_data(
    State(ono): State<FakeOno>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    ono.record(headers)?;
    let data = ono.blobs.lock().unwrap().get(&key_of(&body)).cloned();
    Ok(Json(json!({ "data": data })))
}

async fn set_app_data(
    State(ono): State<FakeOno>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    ono.record(headers)?;
    let value = body["dataValue"].as_str().unwrap_or_default().to_string();
    ono.blobs.lock().unwrap().insert(key_of(&body), value);
    Ok(Json(json!({})))
}

async fn start_fake_ono() -> anyhow::Result<(FakeOno, String)> {
    let ono = FakeOno::default();
    let app = Router::new()
        .route("/grpc/GetONOAppDataFromCode", post(get_app_data))
        .route("/grpc/SetONOAppData", post(set_app_data))
        .with_state(ono.clone());

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("fake ONO error: {}", e); }
    });

    Ok((ono, format!("http://{}:{}/grpc/", addr.ip(), addr.port())))
}

fn transport(base_url: &str, token: Option<&str>) -> Arc<HttpOnoTransport> {
    Arc::new(
        HttpOnoTransport::new(base_url, token, Duration::from_secs(2), Duration::from_secs(5))
            .expect("build transport"),
    )
}

fn groups_store(transport: Arc<HttpOnoTransport>) -> RemoteCollectionStore<Group> {
    RemoteCollectionStore::new(
        transport,
        CollectionKey::new("note_test", "groups"),
        RetryPolicy::new(3, Duration::from_millis(5), Duration::from_millis(20), true),
        Operator::new("Mamma", "Mia"),
    )
}

#[tokio::test]
async fn update_round_trips_through_http() -> anyhow::Result<()> {
    let (ono, base_url) = start_fake_ono().await?;
    let store = groups_store(transport(&base_url, None));

    // fresh data name: nothing stored yet
    assert_eq!(store.load().await.map(|s| s.items.len()), Some(0));

    let patch = json!({"id": 1, "title": "A"}).as_object().cloned().unwrap_or_default();
    store.update(&ItemId::Number(1), &patch).await?;
    let patch = json!({"title": "B"}).as_object().cloned().unwrap_or_default();
    store.update(&ItemId::Number(1), &patch).await?;

    let snapshot = store.try_load().await?;
    assert_eq!(snapshot.items, vec![Group::new(1, "B")]);
    assert!(!snapshot.occupied);

    let raw = ono.blobs.lock().unwrap().get(&("note_test".to_string(), "groups".to_string())).cloned();
    let stored: Value = serde_json::from_str(&raw.unwrap_or_default())?;
    assert_eq!(stored, json!([[{"id": 1, "title": "B", "isEditing": false}], [{"isOccupied": false}]]));
    Ok(())
}

#[tokio::test]
async fn requests_carry_json_and_grpc_metadata_headers() -> anyhow::Result<()> {
    let (ono, base_url) = start_fake_ono().await?;
    let t = transport(&base_url, Some("secret-token"));
    t.get_app_data(&CollectionKey::new("note_test", "test")).await?;

    let headers = ono.headers.lock().unwrap().clone();
    let h = &headers[0];
    assert_eq!(h.get("content-type").and_then(|v| v.to_str().ok()), Some("application/json"));
    assert_eq!(h.get("grpc-metadata-content-type").and_then(|v| v.to_str().ok()), Some("application/grpc"));
    assert_eq!(h.get("authorization").and_then(|v| v.to_str().ok()), Some("Bearer secret-token"));
    Ok(())
}

#[tokio::test]
async fn no_authorization_header_without_token() -> anyhow::Result<()> {
    let (ono, base_url) = start_fake_ono().await?;
    transport(&base_url, None).get_app_data(&CollectionKey::new("note_test", "test")).await?;
    let headers = ono.headers.lock().unwrap().clone();
    assert!(headers[0].get("authorization").is_none());
    Ok(())
}

#[tokio::test]
async fn http_errors_surface_on_save_and_are_swallowed_by_load() -> anyhow::Result<()> {
    let (ono, base_url) = start_fake_ono().await?;
    let store = groups_store(transport(&base_url, None));
    *ono.fail_status.lock().unwrap() = Some(503);

    assert!(store.load().await.is_none());

    let err = store.save(&[Group::new(1, "A")], false).await.unwrap_err();
    assert!(matches!(err, StoreError::Http { action: "SetONOAppData", status: 503, .. }));
    Ok(())
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() -> anyhow::Result<()> {
    // bind then drop to get a port with nothing listening
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let store = groups_store(transport(&format!("http://{}/grpc", addr), None));
    assert!(store.load().await.is_none());

    let patch = json!({"title": "x"}).as_object().cloned().unwrap_or_default();
    let err = store.update(&ItemId::Number(1), &patch).await.unwrap_err();
    assert!(matches!(err, StoreError::LoadFailed { collection: "groups", .. }));
    Ok(())
}
