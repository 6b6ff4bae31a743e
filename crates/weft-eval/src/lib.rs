pub mod context;
pub mod resolve;
pub mod script;
pub mod template;

pub use context::EvalContext;
pub use script::{Effect, EvalError, ScriptEnv, ScriptOutcome, eval_script, sanitize_identifier};
pub use template::{display_string, evaluate, evaluate_deep, has_markers};
