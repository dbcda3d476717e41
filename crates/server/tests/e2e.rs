use std::net::SocketAddr;
use std::path::PathBuf;

use common::client::{ClientError, CollectionClient};
use common::types::Roster;
use configs::AppConfig;
use reqwest::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;
use uuid::Uuid;

struct TestApp {
    base_url: String,
    data_dir: PathBuf,
}

impl TestApp {
    fn client(&self) -> CollectionClient {
        CollectionClient::new(&self.base_url, "/api")
    }
}

async fn start_server() -> anyhow::Result<TestApp> {
    // isolated data file per test run
    let data_dir = std::env::temp_dir().join(format!("roster_e2e_{}", Uuid::new_v4()));
    let mut cfg = AppConfig::default();
    cfg.storage.data_file = data_dir.join("students.json").to_string_lossy().into_owned();
    cfg.storage.frontend_dir = data_dir.join("frontend").to_string_lossy().into_owned();
    cfg.normalize_and_validate()?;

    let app = server::startup::build_app(&cfg).await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp { base_url, data_dir })
}

#[tokio::test]
async fn e2e_seeded_roster_grows_through_client() -> anyhow::Result<()> {
    let app = start_server().await?;
    let client = app.client();

    let fetched = client.fetch_roster().await?;
    assert_eq!(fetched.value, Roster::default());
    assert!(fetched.etag.is_some());

    client.add_student("Alice").await?;
    client.add_student("Bob").await?;

    let doc = client.fetch_document().await?.value;
    assert_eq!(doc, json!({"students": ["Alice", "Bob"]}));

    // persisted to the configured file
    let on_disk: serde_json::Value =
        serde_json::from_slice(&tokio::fs::read(app.data_dir.join("students.json")).await?)?;
    assert_eq!(on_disk, doc);

    let _ = tokio::fs::remove_dir_all(&app.data_dir).await;
    Ok(())
}

#[tokio::test]
async fn e2e_second_stale_writer_gets_precondition_failed() -> anyhow::Result<()> {
    let app = start_server().await?;
    let first = app.client();
    let second = app.client();

    let mut a = first.fetch_roster().await?;
    let mut b = second.fetch_roster().await?;
    a.value.add_student("Carol");
    b.value.add_student("Dave");

    first.save_roster(&a.value, a.etag.as_deref()).await?;
    let err = second.save_roster(&b.value, b.etag.as_deref()).await.unwrap_err();
    match err {
        ClientError::Status { status, .. } => assert_eq!(status, StatusCode::PRECONDITION_FAILED),
        other => panic!("unexpected error: {other}"),
    }

    // without a precondition the last write wins
    second.save_roster(&b.value, None).await?;
    assert_eq!(first.fetch_roster().await?.value, Roster::new(["Dave"]));

    let _ = tokio::fs::remove_dir_all(&app.data_dir).await;
    Ok(())
}

#[tokio::test]
async fn e2e_removed_medium_surfaces_as_status_error() -> anyhow::Result<()> {
    let app = start_server().await?;
    let client = app.client();
    tokio::fs::remove_file(app.data_dir.join("students.json")).await?;

    let err = client.fetch_document().await.unwrap_err();
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body.contains("Storage Unavailable"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let _ = tokio::fs::remove_dir_all(&app.data_dir).await;
    Ok(())
}
