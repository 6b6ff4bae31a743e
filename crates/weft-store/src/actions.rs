//! Iterative interpreter for action chains.
//!
//! Actions form recursive success/failure chains; the interpreter walks them
//! as a flat loop so long chains never grow the call stack. Effects that
//! belong to the presentation layer (alerts, modals, navigation, clipboard,
//! downloads) are queued as [`UiEvent`]s the host drains — the store never
//! reaches into the rendering layer directly.

use crate::error::StoreError;
use crate::store::AppStore;
use serde_json::Value;
use weft_core::id::EntityId;
use weft_core::model::{ActionConfig, ActionKind, PropMap};
use weft_eval::{Effect, ScriptEnv, display_string, eval_script};

/// Chains longer than this are cut off as misconfigured.
const MAX_CHAIN_LENGTH: usize = 64;

/// A named event for the presentation layer to observe.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Alert { message: String },
    ShowModal { target: Option<String>, params: Option<PropMap> },
    Navigate { to: String },
    CopyToClipboard { text: String },
    Download { url: String, filename: Option<String> },
}

/// `params.value`-style truthiness: the original only stores a value when it
/// is truthy, so falsy values are skipped, not stored.
fn truthy_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

impl AppStore {
    /// Execute an action chain triggered by `source` (the component whose
    /// event fired). `on_success` runs only after the primary effect
    /// completes without error; `on_failure` only if it raises.
    pub async fn run_action(&mut self, source: EntityId, action: &ActionConfig) {
        let mut current = Some(action.clone());
        let mut steps = 0;
        while let Some(act) = current {
            // Executing a `none` action is a no-op and ends the chain
            if act.kind == ActionKind::None {
                break;
            }
            steps += 1;
            if steps > MAX_CHAIN_LENGTH {
                log::warn!("action chain exceeded {MAX_CHAIN_LENGTH} steps; stopping");
                break;
            }
            current = match self.execute_primary(source, &act).await {
                Ok(()) => act.on_success.map(|next| *next),
                Err(err) => {
                    log::error!("action `{:?}` failed: {err}", act.kind);
                    act.on_failure.map(|next| *next)
                }
            };
        }
    }

    async fn execute_primary(
        &mut self,
        source: EntityId,
        act: &ActionConfig,
    ) -> Result<(), StoreError> {
        match act.kind {
            ActionKind::None => Ok(()),

            ActionKind::Query => {
                let Some(target) = act.target.as_deref().filter(|t| !t.is_empty()) else {
                    return Ok(());
                };
                let target_id = EntityId::intern(target);
                if self.apis.iter().any(|a| a.id == target_id) {
                    self.run_api(target_id).await;
                    if let Some(err) = self
                        .find_api(target_id)
                        .and_then(|a| a.error.clone())
                    {
                        return Err(StoreError::Run(err));
                    }
                } else if self.sql_queries.iter().any(|q| q.id == target_id) {
                    self.run_sql_query(target_id).await;
                    if let Some(err) = self
                        .find_sql_query(target_id)
                        .and_then(|q| q.error.clone())
                    {
                        return Err(StoreError::Run(err));
                    }
                } else {
                    log::warn!("query target not found: {target}");
                }
                Ok(())
            }

            ActionKind::Js => {
                let Some(code) = act.target.as_deref().filter(|c| !c.is_empty()) else {
                    return Ok(());
                };
                let effects = {
                    let ctx = self.eval_context();
                    let env = ScriptEnv::for_actions(&ctx);
                    eval_script(code, &env)?.effects
                };
                self.apply_effects(effects).await;
                Ok(())
            }

            ActionKind::Navigate => {
                if let Some(target) = act.target.clone().filter(|t| !t.is_empty()) {
                    self.push_ui(UiEvent::Navigate { to: target });
                }
                Ok(())
            }

            ActionKind::Alert => {
                let message = act
                    .param("message")
                    .map(display_string)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Alert triggered".to_string());
                self.push_ui(UiEvent::Alert { message });
                Ok(())
            }

            ActionKind::Modal => {
                self.push_ui(UiEvent::ShowModal {
                    target: act.target.clone(),
                    params: act.params.clone(),
                });
                Ok(())
            }

            ActionKind::Store => {
                if let (Some(target), Some(value)) = (act.target.as_deref(), act.param("value"))
                    && !target.is_empty()
                    && truthy_value(value)
                {
                    let value = value.clone();
                    self.update_global_state(target, value);
                }
                Ok(())
            }

            ActionKind::Copy => {
                if let Some(text) = act.param("text").filter(|t| truthy_value(t)) {
                    let text = display_string(text);
                    self.push_ui(UiEvent::CopyToClipboard { text });
                }
                Ok(())
            }

            ActionKind::Download => {
                if let Some(url) = act.param("url").filter(|u| truthy_value(u)) {
                    let url = display_string(url);
                    let filename = act
                        .param("filename")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    self.push_ui(UiEvent::Download { url, filename });
                }
                Ok(())
            }

            ActionKind::Remove => {
                let target_id = match act.target.as_deref() {
                    None | Some("") | Some("self") => source,
                    Some(other) => EntityId::intern(other),
                };
                self.delete_component(target_id);
                Ok(())
            }
        }
    }

    /// Apply the effects a script requested through its helpers.
    pub(crate) async fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RunApi(id) => {
                    let id = EntityId::intern(&id);
                    if self.apis.iter().any(|a| a.id == id) {
                        self.run_api(id).await;
                    } else {
                        log::warn!("script ran unknown api `{id}`");
                    }
                }
                Effect::RunSqlQuery(id) => {
                    let id = EntityId::intern(&id);
                    if self.sql_queries.iter().any(|q| q.id == id) {
                        self.run_sql_query(id).await;
                    } else {
                        log::warn!("script ran unknown query `{id}`");
                    }
                }
                Effect::UpdateGlobalState { key, value } => {
                    self.update_global_state(&key, value);
                }
                Effect::Navigate { to } => self.push_ui(UiEvent::Navigate { to }),
                Effect::ShowAlert { message } => self.push_ui(UiEvent::Alert { message }),
                Effect::CopyToClipboard { text } => {
                    self.push_ui(UiEvent::CopyToClipboard { text });
                }
                Effect::Download { url, filename } => {
                    self.push_ui(UiEvent::Download { url, filename });
                }
            }
        }
    }
}
