//! End-to-end tests for tap-kpa
//!
//! Exercises the full pipeline — discovery, selection resolution, and
//! the sync engine — against a mock API server, checking the output
//! message sequence and the resumability contract.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tap_kpa::catalog::{build_catalog, discover_streams, resolve_selection, SelectedStream};
use tap_kpa::config::TapConfig;
use tap_kpa::engine::{SyncEngine, SyncSummary};
use tap_kpa::http::ApiClient;
use tap_kpa::messages::MessageWriter;
use tap_kpa::state::State;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JAN_1_2020_MS: i64 = 1_577_836_800_000;

fn config_for(server: &MockServer) -> TapConfig {
    TapConfig::from_json(&format!(
        r#"{{
            "access_token": "t",
            "base_url": "{}",
            "start_date": "2020-01-01",
            "max_retries": 2,
            "page_size": 2
        }}"#,
        server.uri()
    ))
    .unwrap()
}

async fn sync_with_state(
    config: &TapConfig,
    streams: Vec<SelectedStream>,
    state: State,
) -> (Vec<Value>, SyncSummary) {
    let client = ApiClient::new(config).unwrap();
    let mut engine = SyncEngine::new(&client, config, MessageWriter::new(Vec::new()), state);
    let summary = engine.sync_all(&streams).await;
    let out = engine.into_writer().into_inner();

    let lines = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (lines, summary)
}

fn response_record(id: i64, updated: i64) -> Value {
    json!({ "id": id, "created": updated - 1000, "updated": updated, "form_id": 11 })
}

async fn mount_forms(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/forms.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "forms": [{"id": 11, "name": "Incident Report"}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_run_discovery_selection_and_sync() {
    let server = MockServer::start().await;
    mount_forms(&server).await;

    // Two pages of form responses, filtered from the configured start date.
    Mock::given(method("POST"))
        .and(path("/responses.list"))
        .and(body_partial_json(json!({
            "form_id": 11,
            "page": 1,
            "limit": 2,
            "updated_after": JAN_1_2020_MS
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "responses": [response_record(1, 1_580_000_000_000), response_record(2, 1_580_100_000_000)],
            "paging": {"last_page": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/responses.list"))
        .and(body_partial_json(json!({"page": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "responses": [response_record(3, 1_580_200_000_000)],
            "paging": {"last_page": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = ApiClient::new(&config).unwrap();

    // Discovery sees the built-ins plus the per-form stream.
    let descriptors = discover_streams(&client).await.unwrap();
    let mut catalog = build_catalog(&descriptors);
    assert_eq!(catalog.streams.len(), 4);

    let entry = catalog
        .get_entry("Incident_Report_responses")
        .expect("form stream discovered");
    assert_eq!(entry.bookmark_field.as_deref(), Some("updated"));

    // Select only the form stream.
    for entry in &mut catalog.streams {
        if entry.stream == "Incident_Report_responses" {
            entry.selected = Some(true);
        }
    }
    let selected = resolve_selection(&descriptors, &catalog).unwrap();
    assert_eq!(selected.len(), 1);

    let (lines, summary) = sync_with_state(&config, selected, State::new()).await;
    assert!(summary.success());

    let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec!["SCHEMA", "RECORD", "RECORD", "STATE", "RECORD", "STATE"]
    );

    // The schema precedes all records, and records preserve source order.
    assert_eq!(lines[0]["stream"], "Incident_Report_responses");
    assert_eq!(lines[1]["record"]["id"], 1);
    assert_eq!(lines[2]["record"]["id"], 2);
    assert_eq!(lines[4]["record"]["id"], 3);

    // Page-1 checkpoint carries the page maximum; the final state the
    // stream maximum.
    assert_eq!(
        lines[3]["value"]["bookmarks"]["Incident_Report_responses"]["updated"],
        1_580_100_000_000_i64
    );
    assert_eq!(
        lines[5]["value"]["bookmarks"]["Incident_Report_responses"]["updated"],
        1_580_200_000_000_i64
    );
}

#[tokio::test]
async fn resuming_from_an_emitted_state_never_regresses() {
    let server = MockServer::start().await;
    mount_forms(&server).await;

    // First run: one page, bookmark lands at 1_580_100_000_000.
    Mock::given(method("POST"))
        .and(path("/responses.list"))
        .and(body_partial_json(json!({"updated_after": JAN_1_2020_MS})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "responses": [response_record(1, 1_580_100_000_000)],
            "paging": {"last_page": 1}
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = ApiClient::new(&config).unwrap();
    let descriptors = discover_streams(&client).await.unwrap();
    let form_stream = descriptors
        .iter()
        .find(|d| d.name == "Incident_Report_responses")
        .unwrap()
        .clone();

    let (lines, summary) = sync_with_state(
        &config,
        vec![SelectedStream::all_fields(form_stream.clone())],
        State::new(),
    )
    .await;
    assert!(summary.success());

    // Persist the last emitted STATE exactly as a loader would.
    let final_state: State =
        serde_json::from_value(lines.last().unwrap()["value"].clone()).unwrap();
    assert_eq!(
        final_state.bookmark_value("Incident_Report_responses", "updated"),
        Some(&json!(1_580_100_000_000_i64))
    );

    // Second run resumes from the persisted bookmark, not start_date.
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/responses.list"))
        .and(body_partial_json(json!({"updated_after": 1_580_100_000_000_i64})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "responses": [response_record(9, 1_580_500_000_000)],
            "paging": {"last_page": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (lines, summary) = sync_with_state(
        &config,
        vec![SelectedStream::all_fields(form_stream)],
        final_state,
    )
    .await;
    assert!(summary.success());

    // All emitted bookmark values are >= the resumed bookmark.
    for line in &lines {
        if line["type"] == "RECORD" {
            assert!(line["record"]["updated"].as_i64().unwrap() >= 1_580_100_000_000);
        }
    }
    assert_eq!(
        lines.last().unwrap()["value"]["bookmarks"]["Incident_Report_responses"]["updated"],
        1_580_500_000_000_i64
    );
}

#[tokio::test]
async fn selection_cannot_break_record_identity() {
    let server = MockServer::start().await;
    mount_forms(&server).await;

    Mock::given(method("POST"))
        .and(path("/users.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "users": [{
                "id": "u1",
                "email": "u1@example.com",
                "firstname": "Ada",
                "lastname": "L"
            }]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = ApiClient::new(&config).unwrap();
    let descriptors = discover_streams(&client).await.unwrap();

    // Deselect the primary key on purpose.
    let mut catalog = build_catalog(&descriptors);
    for entry in &mut catalog.streams {
        if entry.stream == "users" {
            entry.selected = Some(true);
            entry.fields = Some(vec!["email".to_string(), "firstname".to_string()]);
        }
    }

    let selected = resolve_selection(&descriptors, &catalog).unwrap();
    let (lines, summary) = sync_with_state(&config, selected, State::new()).await;
    assert!(summary.success());

    let record = lines
        .iter()
        .find(|l| l["type"] == "RECORD")
        .expect("one record emitted");
    // The key is still present; unselected fields are not.
    assert_eq!(record["record"]["id"], "u1");
    assert_eq!(record["record"]["email"], "u1@example.com");
    assert!(record["record"].get("lastname").is_none());
}

#[tokio::test]
async fn rate_limited_run_completes_after_retry() {
    let server = MockServer::start().await;
    mount_forms(&server).await;

    // First attempt is a 429 with a tiny retry-after; the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/users.list"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_string("slow down"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "users": [{"id": "u1"}]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = ApiClient::new(&config).unwrap();
    let descriptors = discover_streams(&client).await.unwrap();
    let users = descriptors.iter().find(|d| d.name == "users").unwrap().clone();

    let (lines, summary) = sync_with_state(
        &config,
        vec![SelectedStream::all_fields(users)],
        State::new(),
    )
    .await;

    assert!(summary.success());
    assert_eq!(summary.stats.records_synced, 1);
    assert_eq!(lines[1]["record"]["id"], "u1");
}

#[tokio::test]
async fn sibling_streams_survive_one_stream_failing() {
    let server = MockServer::start().await;
    mount_forms(&server).await;

    Mock::given(method("POST"))
        .and(path("/roles.list"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "users": [{"id": "u1"}]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = ApiClient::new(&config).unwrap();
    let descriptors = discover_streams(&client).await.unwrap();

    let mut catalog = build_catalog(&descriptors);
    for entry in &mut catalog.streams {
        if entry.stream == "roles" || entry.stream == "users" {
            entry.selected = Some(true);
        }
    }
    let selected = resolve_selection(&descriptors, &catalog).unwrap();

    let (lines, summary) = sync_with_state(&config, selected, State::new()).await;

    // The run reports failure overall, but the healthy stream completed.
    assert!(!summary.success());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "roles");

    let user_records: Vec<&Value> = lines
        .iter()
        .filter(|l| l["type"] == "RECORD" && l["stream"] == "users")
        .collect();
    assert_eq!(user_records.len(), 1);

    // No STATE message ever mentions the failed stream.
    for line in &lines {
        if line["type"] == "STATE" {
            assert!(line["value"]["bookmarks"].get("roles").is_none());
        }
    }
}
