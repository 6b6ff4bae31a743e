//! End-to-end binding flow: component props bound to live query/API results
//! resolve through the store's evaluation context.

use pretty_assertions::assert_eq;
use serde_json::json;
use weft_core::geometry::Point;
use weft_core::id::EntityId;
use weft_core::model::{ComponentKind, SqlQuery};
use weft_eval::{evaluate, evaluate_deep};
use weft_store::AppStore;

#[tokio::test(start_paused = true)]
async fn table_binding_tracks_query_result() {
    let mut store = AppStore::in_memory();
    let query_id = store.add_sql_query(SqlQuery::new(
        EntityId::intern("users_query"),
        "Users",
        EntityId::intern("ds-1"),
    ));
    store.place_component(ComponentKind::Table, Point::new(0.0, 0.0), 400.0, 200.0);

    // Before the query runs, the binding resolves to undefined → null
    let before = evaluate("{{users_query.data}}", &store.eval_context());
    assert_eq!(before, json!(null));

    store.run_sql_query(query_id).await;

    // After the run, the same binding carries the rows with type preserved
    let after = evaluate("{{users_query.data}}", &store.eval_context());
    let rows = after.as_array().expect("rows should be an array");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["name"], json!("John Doe"));

    // Embedded use stringifies instead
    let text = evaluate("first: {{users_query.data.0.name}}", &store.eval_context());
    assert_eq!(text, json!("first: John Doe"));
}

#[tokio::test]
async fn action_params_evaluate_deeply_against_store_state() {
    let mut store = AppStore::in_memory();
    store.update_global_state("city", json!("Oslo"));
    store.update_global_state("limit", json!(25));

    let params = json!({
        "q": "{{appsmith.store.city}}",
        "page": {"size": "{{appsmith.store.limit}}", "index": 1},
        "verbose": false
    });
    let resolved = evaluate_deep(&params, &store.eval_context());
    assert_eq!(
        resolved,
        json!({
            "q": "Oslo",
            "page": {"size": 25, "index": 1},
            "verbose": false
        })
    );
}

#[test]
fn component_virtual_props_resolve_from_working_list() {
    let mut store = AppStore::in_memory();
    let input = store.place_component(ComponentKind::Input, Point::new(0.0, 0.0), 200.0, 40.0);
    store.update_component(input, |c| {
        c.props.insert("defaultText".into(), json!("ada@example.com"));
    });
    let input_id = store.find_component(input).unwrap().id.as_str().to_string();

    let value = evaluate(
        &format!("{{{{{input_id}.text}}}}"),
        &store.eval_context(),
    );
    assert_eq!(value, json!("ada@example.com"));
}
