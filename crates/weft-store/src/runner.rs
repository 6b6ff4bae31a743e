//! Run lifecycles for APIs, SQL queries and datasource tests.
//!
//! Each run follows the same three-phase state machine:
//! `idle → loading (error cleared) → success | failure (loading cleared)`.
//! Template expressions embedded in an API's url, params, headers and body
//! are resolved against the pre-run context before the request is issued.
//! Failures are captured into the owning entity — a run never raises out of
//! the store.
//!
//! Timeouts apply to both API paths (plain and authenticated). Same-entity
//! runs are serialized by the `&mut self` receiver; the last completed run's
//! write wins.

use crate::error::StoreError;
use crate::store::AppStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use weft_core::id::EntityId;
use weft_core::model::*;
use weft_eval::{display_string, evaluate, evaluate_deep};

pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const SIMULATED_QUERY_DELAY: Duration = Duration::from_millis(1200);
const SIMULATED_CONNECT_DELAY: Duration = Duration::from_millis(1500);

/// A fully resolved outbound request, ready to dispatch.
struct ResolvedRequest {
    method: HttpMethod,
    url: reqwest::Url,
    headers: BTreeMap<String, String>,
    basic_auth: Option<(String, String)>,
    body: Option<String>,
    timeout: Duration,
}

impl AppStore {
    // ─── APIs ────────────────────────────────────────────────────────────

    /// Run an API without applying its authentication config.
    pub async fn run_api(&mut self, id: EntityId) {
        self.execute_api(id, false).await;
    }

    /// Run an API with bearer / basic / api-key authentication applied.
    pub async fn run_api_with_auth(&mut self, id: EntityId) {
        self.execute_api(id, true).await;
    }

    async fn execute_api(&mut self, id: EntityId, with_auth: bool) {
        let Some(api) = self.apis.iter().find(|a| a.id == id).cloned() else {
            log::warn!("run_api: unknown api `{id}`");
            return;
        };

        // Resolve bindings against the pre-run state, before the loading flip
        let request = self.resolve_request(&api, with_auth);

        self.mark_api_loading(id);

        let outcome = match request {
            Ok(request) => self.dispatch(request).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(response) => {
                self.update_api(id, |api| {
                    api.is_loading = false;
                    api.response = Some(response);
                });
            }
            Err(err) => {
                let message = err.to_string();
                log::error!("api `{id}` failed: {message}");
                self.update_api(id, |api| {
                    api.is_loading = false;
                    api.response = None;
                    api.error = Some(message);
                });
            }
        }
    }

    fn mark_api_loading(&mut self, id: EntityId) {
        self.update_api(id, |api| {
            api.is_loading = true;
            api.error = None;
        });
    }

    /// Resolve url/params/headers/body expressions and assemble the request.
    fn resolve_request(
        &self,
        api: &ApiEndpoint,
        with_auth: bool,
    ) -> Result<ResolvedRequest, StoreError> {
        let ctx = self.eval_context();

        let final_url = display_string(&evaluate(&api.url, &ctx));
        let mut url =
            reqwest::Url::parse(&final_url).map_err(|err| StoreError::InvalidUrl {
                url: final_url.clone(),
                reason: err.to_string(),
            })?;

        // GET requests fold resolved params into the query string
        if api.method == HttpMethod::Get && !api.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, raw) in &api.params {
                let resolved = evaluate(raw, &ctx);
                pairs.append_pair(key, &display_string(&resolved));
            }
            drop(pairs);
        }

        let mut headers = BTreeMap::new();
        for (key, raw) in &api.headers {
            headers.insert(key.clone(), display_string(&evaluate(raw, &ctx)));
        }

        let body = api.body.as_deref().map(|raw| {
            let resolved = evaluate(raw, &ctx);
            match &resolved {
                Value::Object(_) | Value::Array(_) => {
                    serde_json::to_string(&resolved).unwrap_or_default()
                }
                other => display_string(other),
            }
        });

        let mut basic_auth = None;
        if with_auth {
            match api.authentication.kind {
                AuthKind::None => {}
                AuthKind::Bearer => {
                    if let Some(token) = &api.authentication.token {
                        headers.insert("Authorization".into(), format!("Bearer {token}"));
                    }
                }
                AuthKind::ApiKey => {
                    if let Some(key) = &api.authentication.api_key {
                        let header = api
                            .authentication
                            .api_key_header
                            .clone()
                            .unwrap_or_else(|| "X-API-Key".into());
                        headers.insert(header, key.clone());
                    }
                }
                AuthKind::Basic => {
                    if let Some(username) = &api.authentication.username {
                        basic_auth = Some((
                            username.clone(),
                            api.authentication.password.clone().unwrap_or_default(),
                        ));
                    }
                }
            }
        }

        Ok(ResolvedRequest {
            method: api.method,
            url,
            headers,
            basic_auth,
            body,
            timeout: Duration::from_millis(api.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        })
    }

    async fn dispatch(&self, request: ResolvedRequest) -> Result<ApiResponse, StoreError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        let mut builder = self
            .http
            .request(method, request.url)
            .timeout(request.timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some((username, password)) = request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        if request.method != HttpMethod::Get
            && let Some(body) = request.body
            && !body.is_empty()
        {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            headers.insert(
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).to_string(),
            );
        }

        // Parse as JSON, fall back to raw text
        let text = response.text().await?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    // ─── SQL queries (simulated) ─────────────────────────────────────────

    /// Run a query against the mock executor.
    pub async fn run_sql_query(&mut self, id: EntityId) {
        if !self.sql_queries.iter().any(|q| q.id == id) {
            log::warn!("run_sql_query: unknown query `{id}`");
            return;
        }
        self.update_sql_query(id, |query| {
            query.is_loading = true;
            query.error = None;
        });

        tokio::time::sleep(SIMULATED_QUERY_DELAY).await;
        let rows = mock_rows();

        self.update_sql_query(id, |query| {
            query.is_loading = false;
            query.result = Some(rows);
        });
    }

    // ─── Datasources (simulated) ─────────────────────────────────────────

    /// Test a datasource connection. Marks the datasource tested either way.
    pub async fn test_datasource_connection(&mut self, id: EntityId) -> bool {
        if !self.datasources.iter().any(|d| d.id == id) {
            log::warn!("test_datasource_connection: unknown datasource `{id}`");
            return false;
        }

        tokio::time::sleep(SIMULATED_CONNECT_DELAY).await;

        self.update_datasource(id, |datasource| {
            datasource.is_connected = Some(true);
            datasource.last_tested = Some(chrono::Utc::now());
        });
        true
    }
}

/// Rows returned by the mock executor for every query.
fn mock_rows() -> Vec<Value> {
    serde_json::json!([
        {"id": 1, "name": "John Doe", "email": "john@example.com", "role": "Admin", "created_at": "2024-01-15"},
        {"id": 2, "name": "Jane Smith", "email": "jane@example.com", "role": "User", "created_at": "2024-01-16"},
        {"id": 3, "name": "Bob Johnson", "email": "bob@example.com", "role": "Editor", "created_at": "2024-01-17"},
    ])
    .as_array()
    .cloned()
    .unwrap_or_default()
}
