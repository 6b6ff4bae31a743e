//! Structured dotted-path resolution for template markers.
//!
//! A marker's code is first tried as a plain path: the reserved global-state
//! namespace, then component / API / query ids, then bare global-state keys.
//! Widget kinds expose a handful of virtual properties (an input's `text`,
//! a table's `selectedRow`, …) through a resolver table registered once;
//! anything else falls back to a generic walk through the entity's props.
//! Only when no entity matches does the code go to the script evaluator.

use crate::context::EvalContext;
use crate::script::{self, EvalError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use weft_core::model::{ApiEndpoint, ComponentKind, ComponentNode, SqlQuery};

/// Reserved first segment for global-state references (`appsmith.store.key`).
/// This is the binding dialect users author against; renaming it would break
/// every existing binding string.
const GLOBAL_NAMESPACE: &str = "appsmith";
const STORE_SEGMENT: &str = "store";

/// Resolve a marker's code to a value. `Ok(None)` means `undefined`.
pub(crate) fn resolve_code(
    code: &str,
    ctx: &EvalContext<'_>,
) -> Result<Option<Value>, EvalError> {
    let parts: Vec<&str> = code.split('.').collect();
    let head = parts[0];

    if head == GLOBAL_NAMESPACE && parts.get(1) == Some(&STORE_SEGMENT) {
        // The remaining segments form one flat key, dots included
        let key = parts[2..].join(".");
        return Ok(ctx.global_state.get(&key).cloned());
    }

    if let Some(component) = ctx.find_component(head) {
        return Ok(component_value(component, &parts[1..]));
    }
    if let Some(api) = ctx.find_api(head) {
        return Ok(api_value(api, &parts[1..]));
    }
    if let Some(query) = ctx.find_query(head) {
        return Ok(query_value(query, &parts[1..]));
    }
    if let Some(value) = ctx.global_state.get(head) {
        return Ok(walk(Some(value.clone()), &parts[1..]));
    }

    script::eval_snippet(code, ctx)
}

/// Follow a path into a JSON value. Array segments must parse as indices.
fn walk(start: Option<Value>, path: &[&str]) -> Option<Value> {
    let mut current = start?;
    for part in path {
        current = match current {
            Value::Object(mut map) => map.remove(*part)?,
            Value::Array(mut items) => {
                let idx: usize = part.parse().ok()?;
                if idx < items.len() {
                    items.swap_remove(idx)
                } else {
                    return None;
                }
            }
            _ => return None,
        };
    }
    Some(current)
}

// ─── Component virtual properties ────────────────────────────────────────

/// Outcome of a virtual-property probe.
enum Virtual {
    /// The kind doesn't define this property — fall through to the props walk.
    Miss,
    /// Defined, currently `undefined`.
    Undefined,
    Hit(Value),
}

type KindResolver = fn(&ComponentNode, &[&str]) -> Virtual;

/// Widget kind → virtual property resolver, registered once.
static KIND_RESOLVERS: LazyLock<HashMap<ComponentKind, KindResolver>> = LazyLock::new(|| {
    let mut table: HashMap<ComponentKind, KindResolver> = HashMap::new();
    table.insert(ComponentKind::Input, input_props);
    table.insert(ComponentKind::Button, button_props);
    table.insert(ComponentKind::Select, select_props);
    table.insert(ComponentKind::Checkbox, checkbox_props);
    table.insert(ComponentKind::Table, table_props);
    table
});

fn input_props(component: &ComponentNode, path: &[&str]) -> Virtual {
    match path[0] {
        "text" | "value" => Virtual::Hit(
            component
                .prop("defaultText")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        ),
        // Valid unless explicitly marked invalid
        "isValid" => Virtual::Hit(Value::Bool(
            component.prop("isValid") != Some(&Value::Bool(false)),
        )),
        _ => Virtual::Miss,
    }
}

fn button_props(component: &ComponentNode, path: &[&str]) -> Virtual {
    match path[0] {
        "isLoading" => Virtual::Hit(
            component
                .prop("isLoading")
                .cloned()
                .unwrap_or(Value::Bool(false)),
        ),
        _ => Virtual::Miss,
    }
}

fn select_props(component: &ComponentNode, path: &[&str]) -> Virtual {
    match path[0] {
        "selectedOption" | "value" => match component.prop("selectedValue") {
            Some(v) => Virtual::Hit(v.clone()),
            None => Virtual::Undefined,
        },
        _ => Virtual::Miss,
    }
}

fn checkbox_props(component: &ComponentNode, path: &[&str]) -> Virtual {
    match path[0] {
        "isChecked" | "value" => Virtual::Hit(
            component
                .prop("isChecked")
                .cloned()
                .unwrap_or(Value::Bool(false)),
        ),
        _ => Virtual::Miss,
    }
}

fn table_props(component: &ComponentNode, path: &[&str]) -> Virtual {
    match path[0] {
        "selectedRow" => match component.prop("selectedRow") {
            Some(v) => Virtual::Hit(v.clone()),
            None => Virtual::Undefined,
        },
        "selectedRows" => Virtual::Hit(
            component
                .prop("selectedRows")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
        ),
        "tableData" => Virtual::Hit(
            component
                .prop("tableData")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
        ),
        "pageNo" => Virtual::Hit(component.prop("pageNo").cloned().unwrap_or_else(|| 1.into())),
        "searchText" => Virtual::Hit(
            component
                .prop("searchText")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        ),
        _ => Virtual::Miss,
    }
}

fn component_value(component: &ComponentNode, path: &[&str]) -> Option<Value> {
    if path.is_empty() {
        return serde_json::to_value(component).ok();
    }
    if let Some(resolver) = KIND_RESOLVERS.get(&component.kind) {
        match resolver(component, path) {
            Virtual::Hit(v) => return Some(v),
            Virtual::Undefined => return None,
            Virtual::Miss => {}
        }
    }
    let first = component.props.get(path[0])?.clone();
    walk(Some(first), &path[1..])
}

// ─── API / query properties ──────────────────────────────────────────────

fn api_value(api: &ApiEndpoint, path: &[&str]) -> Option<Value> {
    if path.is_empty() {
        return serde_json::to_value(api).ok();
    }
    match path[0] {
        "data" | "response" => {
            let body = api.response.as_ref().map(|r| r.body.clone());
            walk(body, &path[1..])
        }
        "isLoading" => Some(Value::Bool(api.is_loading)),
        "error" => api.error.clone().map(Value::String),
        _ => None,
    }
}

fn rows_value(query: &SqlQuery) -> Option<Value> {
    query.result.as_ref().map(|rows| Value::Array(rows.clone()))
}

fn query_value(query: &SqlQuery, path: &[&str]) -> Option<Value> {
    // A bare query reference yields its rows, not the definition
    if path.is_empty() {
        return rows_value(query);
    }
    match path[0] {
        "result" | "data" => walk(rows_value(query), &path[1..]),
        "isLoading" => Some(Value::Bool(query.is_loading)),
        "error" => query.error.clone().map(Value::String),
        _ => walk(rows_value(query), path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};
    use weft_core::id::EntityId;
    use weft_core::model::ApiResponse;

    fn component(id: &str, kind: ComponentKind, props: Value) -> ComponentNode {
        let mut c = ComponentNode::new(EntityId::intern(id), kind, 0.0, 0.0, 100.0, 40.0);
        c.props = props.as_object().cloned().unwrap_or_default();
        c
    }

    #[test]
    fn global_namespace_uses_flat_keys() {
        let components = vec![];
        let apis = vec![];
        let queries = vec![];
        let mut global = Map::new();
        global.insert("user.name".into(), json!("Ada"));
        let ctx = EvalContext::new(&components, &apis, &queries, &global);

        // `appsmith.store.user.name` looks up the single key "user.name"
        let v = resolve_code("appsmith.store.user.name", &ctx).unwrap();
        assert_eq!(v, Some(json!("Ada")));
    }

    #[test]
    fn input_exposes_text_alias() {
        let components = vec![component(
            "name_input",
            ComponentKind::Input,
            json!({"defaultText": "hello"}),
        )];
        let apis = vec![];
        let queries = vec![];
        let global = Map::new();
        let ctx = EvalContext::new(&components, &apis, &queries, &global);

        assert_eq!(
            resolve_code("name_input.text", &ctx).unwrap(),
            Some(json!("hello"))
        );
        assert_eq!(
            resolve_code("name_input.value", &ctx).unwrap(),
            Some(json!("hello"))
        );
        assert_eq!(
            resolve_code("name_input.isValid", &ctx).unwrap(),
            Some(json!(true))
        );
    }

    #[test]
    fn table_defaults_for_missing_props() {
        let components = vec![component("orders", ComponentKind::Table, json!({}))];
        let apis = vec![];
        let queries = vec![];
        let global = Map::new();
        let ctx = EvalContext::new(&components, &apis, &queries, &global);

        assert_eq!(resolve_code("orders.pageNo", &ctx).unwrap(), Some(json!(1)));
        assert_eq!(
            resolve_code("orders.tableData", &ctx).unwrap(),
            Some(json!([]))
        );
        assert_eq!(resolve_code("orders.selectedRow", &ctx).unwrap(), None);
    }

    #[test]
    fn generic_prop_walk_falls_through() {
        let components = vec![component(
            "hero",
            ComponentKind::Text,
            json!({"content": {"title": "Welcome"}}),
        )];
        let apis = vec![];
        let queries = vec![];
        let global = Map::new();
        let ctx = EvalContext::new(&components, &apis, &queries, &global);

        assert_eq!(
            resolve_code("hero.content.title", &ctx).unwrap(),
            Some(json!("Welcome"))
        );
        assert_eq!(resolve_code("hero.missing", &ctx).unwrap(), None);
    }

    #[test]
    fn api_data_reads_response_body() {
        let mut api = ApiEndpoint::new(EntityId::intern("users"), "Users");
        api.response = Some(ApiResponse {
            status: 200,
            headers: Default::default(),
            body: json!({"items": [{"name": "Ada"}]}),
        });
        let apis = vec![api];
        let components = vec![];
        let queries = vec![];
        let global = Map::new();
        let ctx = EvalContext::new(&components, &apis, &queries, &global);

        assert_eq!(
            resolve_code("users.data.items.0.name", &ctx).unwrap(),
            Some(json!("Ada"))
        );
        assert_eq!(
            resolve_code("users.isLoading", &ctx).unwrap(),
            Some(json!(false))
        );
        assert_eq!(resolve_code("users.error", &ctx).unwrap(), None);
    }

    #[test]
    fn bare_query_reference_yields_rows() {
        let mut query = SqlQuery::new(
            EntityId::intern("total_assets"),
            "Total assets",
            EntityId::intern("ds-1"),
        );
        query.result = Some(vec![json!({"total": 42})]);
        let queries = vec![query];
        let components = vec![];
        let apis = vec![];
        let global = Map::new();
        let ctx = EvalContext::new(&components, &apis, &queries, &global);

        assert_eq!(
            resolve_code("total_assets", &ctx).unwrap(),
            Some(json!([{"total": 42}]))
        );
        assert_eq!(
            resolve_code("total_assets.data", &ctx).unwrap(),
            Some(json!([{"total": 42}]))
        );
        assert_eq!(
            resolve_code("total_assets.0.total", &ctx).unwrap(),
            Some(json!(42))
        );
    }

    #[test]
    fn bare_global_key_deep_walks() {
        let components = vec![];
        let apis = vec![];
        let queries = vec![];
        let mut global = Map::new();
        global.insert("session".into(), json!({"user": {"role": "admin"}}));
        let ctx = EvalContext::new(&components, &apis, &queries, &global);

        assert_eq!(
            resolve_code("session.user.role", &ctx).unwrap(),
            Some(json!("admin"))
        );
    }
}
