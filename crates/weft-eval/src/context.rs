//! The evaluation context — a borrowed snapshot of every data source a
//! binding expression can reference.
//!
//! The context is rebuilt immediately before each evaluation so expressions
//! always see the latest component props, API responses, query results and
//! global state. It is never persisted and never outlives the evaluation.

use weft_core::model::{ApiEndpoint, ComponentNode, GlobalState, SqlQuery};

/// Borrowed view of the four live collections. Cheap to construct; the
/// builder never mutates its inputs.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub components: &'a [ComponentNode],
    pub apis: &'a [ApiEndpoint],
    pub sql_queries: &'a [SqlQuery],
    pub global_state: &'a GlobalState,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        components: &'a [ComponentNode],
        apis: &'a [ApiEndpoint],
        sql_queries: &'a [SqlQuery],
        global_state: &'a GlobalState,
    ) -> Self {
        Self {
            components,
            apis,
            sql_queries,
            global_state,
        }
    }

    pub fn find_component(&self, id: &str) -> Option<&'a ComponentNode> {
        self.components.iter().find(|c| c.id.as_str() == id)
    }

    pub fn find_api(&self, id: &str) -> Option<&'a ApiEndpoint> {
        self.apis.iter().find(|a| a.id.as_str() == id)
    }

    pub fn find_query(&self, id: &str) -> Option<&'a SqlQuery> {
        self.sql_queries.iter().find(|q| q.id.as_str() == id)
    }
}
