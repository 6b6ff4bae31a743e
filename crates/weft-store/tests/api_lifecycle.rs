//! API run lifecycle against a local mock server: binding resolution into
//! the request, GET param folding, auth headers, and unified timeouts.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use weft_core::id::EntityId;
use weft_core::model::{ApiEndpoint, AuthKind, HttpMethod};
use weft_store::AppStore;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(id: &str, url: String) -> ApiEndpoint {
    let mut api = ApiEndpoint::new(EntityId::intern(id), id);
    api.url = url;
    api
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn run_sets_exactly_one_of_response_or_error() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let mut store = AppStore::in_memory();
    let good = store.add_api(api("good", format!("{}/ok", server.uri())));

    store.run_api(good).await;
    let entity = store.find_api(good).unwrap();
    assert!(!entity.is_loading);
    assert_eq!(entity.response.as_ref().unwrap().status, 200);
    assert_eq!(entity.response.as_ref().unwrap().body, json!({"ok": true}));
    assert!(entity.error.is_none());

    // A failing run captures the error and clears the stale response
    let bad = store.add_api(api("bad", "http://127.0.0.1:1/unreachable".into()));
    store.run_api(bad).await;
    let entity = store.find_api(bad).unwrap();
    assert!(!entity.is_loading);
    assert!(entity.response.is_none());
    assert!(entity.error.is_some());
}

#[tokio::test]
async fn url_bindings_resolve_from_global_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 42}])))
        .mount(&server)
        .await;

    let mut store = AppStore::in_memory();
    store.update_global_state("id", json!("42"));
    let u1 = store.add_api(api(
        "u1",
        format!("{}/users/{{{{appsmith.store.id}}}}", server.uri()),
    ));

    store.run_api(u1).await;
    let entity = store.find_api(u1).unwrap();
    assert_eq!(entity.response.as_ref().unwrap().body, json!([{"id": 42}]));
}

#[tokio::test]
async fn get_folds_resolved_params_into_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Oslo"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": 1})))
        .mount(&server)
        .await;

    let mut store = AppStore::in_memory();
    store.update_global_state("city", json!("Oslo"));
    let mut search = api("search", format!("{}/search", server.uri()));
    search
        .params
        .insert("q".into(), "{{appsmith.store.city}}".into());
    search.params.insert("limit".into(), "10".into());
    let id = store.add_api(search);

    store.run_api(id).await;
    assert_eq!(
        store.find_api(id).unwrap().response.as_ref().unwrap().body,
        json!({"hits": 1})
    );
}

#[tokio::test]
async fn post_sends_resolved_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("x-tenant", "acme"))
        .and(body_string("{\"name\": \"ada\"}"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"created": true})))
        .mount(&server)
        .await;

    let mut store = AppStore::in_memory();
    store.update_global_state("tenant", json!("acme"));
    store.update_global_state("name", json!("ada"));
    let mut create = api("create", format!("{}/users", server.uri()));
    create.method = HttpMethod::Post;
    create
        .headers
        .insert("x-tenant".into(), "{{appsmith.store.tenant}}".into());
    create.body = Some("{\"name\": \"{{appsmith.store.name}}\"}".into());
    let id = store.add_api(create);

    store.run_api(id).await;
    let entity = store.find_api(id).unwrap();
    assert_eq!(entity.response.as_ref().unwrap().status, 201);
}

#[tokio::test]
async fn auth_run_applies_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("X-API-Key", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"secure": true})))
        .mount(&server)
        .await;

    let mut store = AppStore::in_memory();
    let mut secure = api("secure", format!("{}/secure", server.uri()));
    secure.authentication.kind = AuthKind::ApiKey;
    secure.authentication.api_key = Some("s3cret".into());
    let id = store.add_api(secure);

    store.run_api_with_auth(id).await;
    assert_eq!(
        store.find_api(id).unwrap().response.as_ref().unwrap().body,
        json!({"secure": true})
    );
}

#[tokio::test]
async fn timeout_applies_to_both_run_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;

    let mut store = AppStore::in_memory();
    let mut slow = api("slow", format!("{}/slow", server.uri()));
    slow.timeout_ms = Some(50);
    let id = store.add_api(slow);

    store.run_api(id).await;
    assert!(store.find_api(id).unwrap().error.is_some(), "plain path times out");

    store.run_api_with_auth(id).await;
    assert!(
        store.find_api(id).unwrap().error.is_some(),
        "auth path times out"
    );
}

#[tokio::test]
async fn non_json_bodies_fall_back_to_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let mut store = AppStore::in_memory();
    let id = store.add_api(api("plain", format!("{}/plain", server.uri())));
    store.run_api(id).await;
    assert_eq!(
        store.find_api(id).unwrap().response.as_ref().unwrap().body,
        json!("hello")
    );
}

#[tokio::test]
async fn query_action_chains_on_run_result() {
    use weft_core::model::{ActionConfig, ActionKind};
    use weft_store::UiEvent;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("pong")))
        .mount(&server)
        .await;

    let mut store = AppStore::in_memory();
    store.add_api(api("ping", format!("{}/ping", server.uri())));

    let mut act = ActionConfig::new(ActionKind::Query);
    act.target = Some("ping".into());
    act.on_success = Some(Box::new(ActionConfig {
        kind: ActionKind::Alert,
        params: json!({"message": "done"}).as_object().cloned(),
        ..Default::default()
    }));
    store.run_action(EntityId::intern("btn"), &act).await;

    assert_eq!(
        store.take_ui_events(),
        vec![UiEvent::Alert {
            message: "done".into()
        }]
    );
    assert_eq!(
        store.find_api(EntityId::intern("ping")).unwrap().response.as_ref().unwrap().body,
        json!("pong")
    );
}
