//! End-to-end tests for the HTTP API against a mock lookup service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use prospektor_lookup::SonarClient;
use prospektor_pipeline::PipelineSettings;
use prospektor_server::{AppState, configure};
use prospektor_storage::FsBlobStore;
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("prospektor-api-{label}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        rate_capacity: 100,
        rate_period_secs: 1.0,
        concurrency: 5,
        row_timeout_secs: 5.0,
        model: "sonar-pro".to_string(),
    }
}

fn state_with(dir: &Path, lookup: SonarClient) -> web::Data<AppState> {
    web::Data::new(AppState {
        store: Arc::new(FsBlobStore::new(dir)),
        lookup: Arc::new(lookup),
        settings: settings(),
    })
}

async fn mock_lookup_service(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_json(serde_json::json!({
                    "choices": [
                        {"message": {"content": "91 23 45 67\nhttps://proff.no/fjellheim"}}
                    ],
                    "citations": [],
                })),
        )
        .mount(&server)
        .await;
    server
}

fn client_for(server: &MockServer) -> SonarClient {
    SonarClient::new("test-key".to_string(), "sonar-pro".to_string())
        .unwrap()
        .with_base_url(server.uri())
}

#[actix_web::test]
async fn upload_processes_and_serves_progress_and_result() {
    let mock = mock_lookup_service(Duration::ZERO).await;
    let dir = scratch_dir("cycle");
    let state = state_with(&dir, client_for(&mock));
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/upload?filename=kunder.csv")
        .set_payload("Bedrift,Navn\nFjellheim AS,Ola Nordmann\n")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["filename"], "kunder.csv");
    assert_eq!(body["status"], "processing");

    // The run happens in a background task; poll until the result lands.
    let mut downloaded = None;
    for _ in 0..200 {
        let req = test::TestRequest::get()
            .uri("/api/download?filename=kunder.csv")
            .to_request();
        let resp = test::call_service(&app, req).await;
        if resp.status() == StatusCode::OK {
            downloaded = Some(test::read_body(resp).await);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let csv = String::from_utf8(downloaded.expect("run never finished").to_vec()).unwrap();
    assert!(csv.contains("PROSPEKTOR (TLF)"));
    assert!(csv.contains("91234567"));
    assert!(csv.contains("https://proff.no/fjellheim"));

    let req = test::TestRequest::get()
        .uri("/api/progress?filename=kunder.csv")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let progress: Value = test::read_body_json(resp).await;
    assert_eq!(progress["processed"], 1);
    assert_eq!(progress["total"], 1);
    assert_eq!(progress["percentage"], 100.0);
    assert!(progress["lastUpdate"].is_string());
}

#[actix_web::test]
async fn a_fresh_upload_clears_the_previous_result() {
    let mock = mock_lookup_service(Duration::from_millis(500)).await;
    let dir = scratch_dir("reupload");
    let state = state_with(&dir, client_for(&mock));
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/upload?filename=liste.csv")
        .set_payload("Bedrift,Navn\nFjellheim AS,Ola\n")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::ACCEPTED
    );

    let mut finished = false;
    for _ in 0..200 {
        let req = test::TestRequest::get()
            .uri("/api/download?filename=liste.csv")
            .to_request();
        if test::call_service(&app, req).await.status() == StatusCode::OK {
            finished = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(finished, "first run never finished");

    // Uploading again invalidates the stored result before the new run
    // completes; the mock's delay keeps the new run in flight.
    let req = test::TestRequest::post()
        .uri("/api/upload?filename=liste.csv")
        .set_payload("Bedrift,Navn\nBakken AS,Kari\n")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::ACCEPTED
    );

    let req = test::TestRequest::get()
        .uri("/api/download?filename=liste.csv")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = test::read_body(resp).await;
    assert_eq!(body.as_ref(), b"File not ready yet.");
}

#[actix_web::test]
async fn requests_without_a_filename_are_rejected() {
    let mock = mock_lookup_service(Duration::ZERO).await;
    let dir = scratch_dir("missing");
    let state = state_with(&dir, client_for(&mock));
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    for req in [
        test::TestRequest::post().uri("/api/upload").to_request(),
        test::TestRequest::get().uri("/api/progress").to_request(),
        test::TestRequest::get()
            .uri("/api/download?filename=%20")
            .to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        assert_eq!(body.as_ref(), b"Missing filename.");
    }
}

#[actix_web::test]
async fn empty_uploads_are_rejected() {
    let mock = mock_lookup_service(Duration::ZERO).await;
    let dir = scratch_dir("empty");
    let state = state_with(&dir, client_for(&mock));
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/upload?filename=tomt.csv")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = test::read_body(resp).await;
    assert_eq!(body.as_ref(), b"Empty upload.");

    // Nothing was stored and no run was started.
    let req = test::TestRequest::get()
        .uri("/api/progress?filename=tomt.csv")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unknown_files_have_no_progress_or_result() {
    let mock = mock_lookup_service(Duration::ZERO).await;
    let dir = scratch_dir("unknown");
    let state = state_with(&dir, client_for(&mock));
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/progress?filename=ukjent.csv")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        test::read_body(resp).await.as_ref(),
        b"Progress not started."
    );

    let req = test::TestRequest::get()
        .uri("/api/download?filename=ukjent.csv")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(test::read_body(resp).await.as_ref(), b"File not ready yet.");
}

#[actix_web::test]
async fn health_reports_ok() {
    let mock = mock_lookup_service(Duration::ZERO).await;
    let dir = scratch_dir("health");
    let state = state_with(&dir, client_for(&mock));
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
