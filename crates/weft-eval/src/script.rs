//! The embedded expression evaluator — the fallback used when a template
//! marker is not a structured path, and the engine behind `js` actions.
//!
//! This is a deliberately closed capability boundary. Snippets are parsed
//! into a small expression grammar (literals, identifiers, member/index
//! access, arithmetic, comparison, logical operators, ternary, array/object
//! literals, and calls on the injected `helpers` object) and evaluated
//! against an environment of explicitly injected bindings: one sanitized
//! identifier per known component/API/query, plus the four context
//! collections. There is no access to the host process, the filesystem, or
//! any store state that was not injected. Helper calls do not mutate
//! anything directly — they record [`Effect`]s the store applies afterwards.

use crate::context::EvalContext;
use crate::template::display_string;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use weft_core::model::{ApiEndpoint, ComponentNode, SqlQuery};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("`{0}` is not defined")]
    UnknownIdent(String),
    #[error("`{0}` is not a function")]
    NotCallable(String),
    #[error("type error: {0}")]
    Type(String),
}

// ─── AST ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone)]
enum Expr {
    Undefined,
    Literal(Value),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
}

// ─── Parser ──────────────────────────────────────────────────────────────

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

fn skip_space(input: &mut &str) {
    *input = input.trim_start();
}

fn parse_ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let first_ok = input
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$');
    if !first_ok {
        return Err(backtrack());
    }
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '$').parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    let start = *input;
    let _ = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if input.starts_with('.') {
        *input = &input[1..];
        let _ =
            take_while::<_, _, ContextError>(0.., |c: char| c.is_ascii_digit()).parse_next(input);
    }
    let matched = &start[..start.len() - input.len()];
    matched.parse::<f64>().map_err(|_| backtrack())
}

fn parse_string_literal(input: &mut &str) -> ModalResult<String> {
    let quote = match input.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(backtrack()),
    };
    let mut out = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if c == quote {
            *input = &input[i + c.len_utf8()..];
            return Ok(out);
        }
        if c == '\\' {
            match chars.next() {
                Some((_, esc)) => out.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                }),
                None => return Err(backtrack()),
            }
        } else {
            out.push(c);
        }
    }
    // Unterminated string
    Err(backtrack())
}

fn parse_primary(input: &mut &str) -> ModalResult<Expr> {
    skip_space(input);

    if input.starts_with('(') {
        *input = &input[1..];
        let expr = parse_ternary(input)?;
        skip_space(input);
        let _ = ')'.parse_next(input)?;
        return Ok(expr);
    }

    if input.starts_with('[') {
        *input = &input[1..];
        let mut items = Vec::new();
        skip_space(input);
        if !input.starts_with(']') {
            loop {
                items.push(parse_ternary(input)?);
                skip_space(input);
                if input.starts_with(',') {
                    *input = &input[1..];
                    skip_space(input);
                } else {
                    break;
                }
            }
        }
        let _ = ']'.parse_next(input)?;
        return Ok(Expr::Array(items));
    }

    if input.starts_with('{') {
        *input = &input[1..];
        let mut entries = Vec::new();
        skip_space(input);
        if !input.starts_with('}') {
            loop {
                skip_space(input);
                let key = if input.starts_with('\'') || input.starts_with('"') {
                    parse_string_literal(input)?
                } else {
                    parse_ident(input)?.to_string()
                };
                skip_space(input);
                let _ = ':'.parse_next(input)?;
                let value = parse_ternary(input)?;
                entries.push((key, value));
                skip_space(input);
                if input.starts_with(',') {
                    *input = &input[1..];
                    skip_space(input);
                } else {
                    break;
                }
            }
        }
        let _ = '}'.parse_next(input)?;
        return Ok(Expr::Object(entries));
    }

    if input.starts_with('\'') || input.starts_with('"') {
        return parse_string_literal(input).map(|s| Expr::Literal(Value::String(s)));
    }

    if input.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return parse_number(input).map(|n| Expr::Literal(num_value(n)));
    }

    let ident = parse_ident(input)?;
    Ok(match ident {
        "true" => Expr::Literal(Value::Bool(true)),
        "false" => Expr::Literal(Value::Bool(false)),
        "null" => Expr::Literal(Value::Null),
        "undefined" => Expr::Undefined,
        name => Expr::Ident(name.to_string()),
    })
}

fn parse_postfix(input: &mut &str) -> ModalResult<Expr> {
    let mut expr = parse_primary(input)?;
    loop {
        skip_space(input);
        if input.starts_with('.') {
            *input = &input[1..];
            skip_space(input);
            let name = parse_ident(input)?;
            expr = Expr::Member(Box::new(expr), name.to_string());
        } else if input.starts_with('[') {
            *input = &input[1..];
            let index = parse_ternary(input)?;
            skip_space(input);
            let _ = ']'.parse_next(input)?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
        } else if input.starts_with('(') {
            *input = &input[1..];
            let mut args = Vec::new();
            skip_space(input);
            if !input.starts_with(')') {
                loop {
                    args.push(parse_ternary(input)?);
                    skip_space(input);
                    if input.starts_with(',') {
                        *input = &input[1..];
                    } else {
                        break;
                    }
                }
            }
            skip_space(input);
            let _ = ')'.parse_next(input)?;
            expr = Expr::Call(Box::new(expr), args);
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_unary(input: &mut &str) -> ModalResult<Expr> {
    skip_space(input);
    if input.starts_with('!') && !input.starts_with("!=") {
        *input = &input[1..];
        return Ok(Expr::Unary(UnaryOp::Not, Box::new(parse_unary(input)?)));
    }
    if input.starts_with('-') {
        *input = &input[1..];
        return Ok(Expr::Unary(UnaryOp::Neg, Box::new(parse_unary(input)?)));
    }
    parse_postfix(input)
}

fn parse_multiplicative(input: &mut &str) -> ModalResult<Expr> {
    let mut left = parse_unary(input)?;
    loop {
        skip_space(input);
        let op = if input.starts_with('*') {
            BinaryOp::Mul
        } else if input.starts_with('/') {
            BinaryOp::Div
        } else if input.starts_with('%') {
            BinaryOp::Mod
        } else {
            break;
        };
        *input = &input[1..];
        let right = parse_unary(input)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_additive(input: &mut &str) -> ModalResult<Expr> {
    let mut left = parse_multiplicative(input)?;
    loop {
        skip_space(input);
        let op = if input.starts_with('+') {
            BinaryOp::Add
        } else if input.starts_with('-') {
            BinaryOp::Sub
        } else {
            break;
        };
        *input = &input[1..];
        let right = parse_multiplicative(input)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_comparison(input: &mut &str) -> ModalResult<Expr> {
    let mut left = parse_additive(input)?;
    loop {
        skip_space(input);
        let (op, len) = if input.starts_with("<=") {
            (BinaryOp::Le, 2)
        } else if input.starts_with(">=") {
            (BinaryOp::Ge, 2)
        } else if input.starts_with('<') {
            (BinaryOp::Lt, 1)
        } else if input.starts_with('>') {
            (BinaryOp::Gt, 1)
        } else {
            break;
        };
        *input = &input[len..];
        let right = parse_additive(input)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_equality(input: &mut &str) -> ModalResult<Expr> {
    let mut left = parse_comparison(input)?;
    loop {
        skip_space(input);
        let (op, len) = if input.starts_with("===") {
            (BinaryOp::StrictEq, 3)
        } else if input.starts_with("!==") {
            (BinaryOp::StrictNe, 3)
        } else if input.starts_with("==") {
            (BinaryOp::Eq, 2)
        } else if input.starts_with("!=") {
            (BinaryOp::Ne, 2)
        } else {
            break;
        };
        *input = &input[len..];
        let right = parse_comparison(input)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(input: &mut &str) -> ModalResult<Expr> {
    let mut left = parse_equality(input)?;
    loop {
        skip_space(input);
        if !input.starts_with("&&") {
            break;
        }
        *input = &input[2..];
        let right = parse_equality(input)?;
        left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_or(input: &mut &str) -> ModalResult<Expr> {
    let mut left = parse_and(input)?;
    loop {
        skip_space(input);
        if !input.starts_with("||") {
            break;
        }
        *input = &input[2..];
        let right = parse_and(input)?;
        left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_ternary(input: &mut &str) -> ModalResult<Expr> {
    let cond = parse_or(input)?;
    skip_space(input);
    if input.starts_with('?') {
        *input = &input[1..];
        let then = parse_ternary(input)?;
        skip_space(input);
        let _ = ':'.parse_next(input)?;
        let other = parse_ternary(input)?;
        return Ok(Expr::Ternary(
            Box::new(cond),
            Box::new(then),
            Box::new(other),
        ));
    }
    Ok(cond)
}

/// First few characters of the remaining input, for parse error messages.
fn near(input: &str) -> String {
    input.chars().take(24).collect()
}

/// Parse a snippet as one or more `;`-separated expressions.
fn parse_program(code: &str) -> Result<Vec<Expr>, EvalError> {
    let mut input = code;
    let mut exprs = Vec::new();
    skip_space(&mut input);
    while !input.is_empty() {
        let expr = parse_ternary(&mut input)
            .map_err(|_| EvalError::Parse(format!("invalid expression near {:?}", near(input))))?;
        exprs.push(expr);
        skip_space(&mut input);
        if input.starts_with(';') {
            input = &input[1..];
            skip_space(&mut input);
        } else if !input.is_empty() {
            return Err(EvalError::Parse(format!(
                "unexpected input {:?}",
                near(input)
            )));
        }
    }
    if exprs.is_empty() {
        return Err(EvalError::Parse("empty expression".into()));
    }
    Ok(exprs)
}

// ─── Environment ─────────────────────────────────────────────────────────

/// Sanitize an entity id into a legal identifier: non-identifier characters
/// become `_` and a leading digit is prefixed with `_`.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn api_snapshot(api: &ApiEndpoint) -> Value {
    let mut m = Map::new();
    if let Some(resp) = &api.response {
        m.insert("data".into(), resp.body.clone());
        m.insert("response".into(), resp.body.clone());
    }
    m.insert("isLoading".into(), Value::Bool(api.is_loading));
    if let Some(err) = &api.error {
        m.insert("error".into(), Value::String(err.clone()));
    }
    Value::Object(m)
}

fn query_snapshot(query: &SqlQuery) -> Value {
    let mut m = Map::new();
    if let Some(rows) = &query.result {
        m.insert("data".into(), Value::Array(rows.clone()));
        m.insert("result".into(), Value::Array(rows.clone()));
    }
    m.insert("isLoading".into(), Value::Bool(query.is_loading));
    if let Some(err) = &query.error {
        m.insert("error".into(), Value::String(err.clone()));
    }
    Value::Object(m)
}

fn component_snapshot(component: &ComponentNode) -> Value {
    let mut m = Map::new();
    m.insert("props".into(), Value::Object(component.props.clone()));
    m.insert(
        "type".into(),
        Value::String(component.kind.as_str().to_string()),
    );
    m.insert("id".into(), Value::String(component.id.as_str().to_string()));
    Value::Object(m)
}

/// The set of bindings a snippet is allowed to see.
pub struct ScriptEnv {
    /// Bare identifiers: entity snapshots and/or the context collections.
    bindings: HashMap<String, Value>,
    /// The four collections, reachable via `helpers.<name>` in action scripts.
    collections: HashMap<String, Value>,
    /// Whether the `helpers` object is exposed (action scripts only).
    helpers: bool,
}

impl ScriptEnv {
    fn collections_of(ctx: &EvalContext<'_>) -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert(
            "components".to_string(),
            Value::Array(
                ctx.components
                    .iter()
                    .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
                    .collect(),
            ),
        );
        m.insert(
            "apis".to_string(),
            Value::Array(
                ctx.apis
                    .iter()
                    .map(|a| serde_json::to_value(a).unwrap_or(Value::Null))
                    .collect(),
            ),
        );
        m.insert(
            "sqlQueries".to_string(),
            Value::Array(
                ctx.sql_queries
                    .iter()
                    .map(|q| serde_json::to_value(q).unwrap_or(Value::Null))
                    .collect(),
            ),
        );
        m.insert(
            "globalState".to_string(),
            Value::Object(ctx.global_state.clone()),
        );
        m
    }

    /// Environment for binding-expression fallback: the four collections plus
    /// one sanitized snapshot binding per known component/API/query. No
    /// helpers — plain bindings cannot trigger effects.
    pub fn from_context(ctx: &EvalContext<'_>) -> Self {
        let collections = Self::collections_of(ctx);
        let mut bindings = collections.clone();
        for api in ctx.apis {
            bindings.insert(sanitize_identifier(api.id.as_str()), api_snapshot(api));
        }
        for query in ctx.sql_queries {
            bindings.insert(sanitize_identifier(query.id.as_str()), query_snapshot(query));
        }
        for component in ctx.components {
            bindings.insert(
                sanitize_identifier(component.id.as_str()),
                component_snapshot(component),
            );
        }
        Self {
            bindings,
            collections,
            helpers: false,
        }
    }

    /// Environment for `js` actions: scripts see only the `helpers` object
    /// (collections plus effect-producing helper functions).
    pub fn for_actions(ctx: &EvalContext<'_>) -> Self {
        Self {
            bindings: HashMap::new(),
            collections: Self::collections_of(ctx),
            helpers: true,
        }
    }
}

// ─── Effects ─────────────────────────────────────────────────────────────

/// A side effect requested by a script through a helper call. Scripts never
/// mutate anything directly; the store applies these after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RunApi(String),
    RunSqlQuery(String),
    UpdateGlobalState { key: String, value: Value },
    Navigate { to: String },
    ShowAlert { message: String },
    CopyToClipboard { text: String },
    Download { url: String, filename: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Helper {
    RunApi,
    RunSqlQuery,
    UpdateGlobalState,
    Navigate,
    ShowAlert,
    CopyToClipboard,
    Download,
}

/// Result of running a snippet: the final expression's value (`None` for
/// `undefined`) plus any requested effects.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    pub value: Option<Value>,
    pub effects: Vec<Effect>,
}

// ─── Interpreter ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Evaluated {
    Undefined,
    Val(Value),
    HelperNs,
    HelperFn(Helper),
}

struct Interp<'a> {
    env: &'a ScriptEnv,
    effects: Vec<Effect>,
}

/// Parse and evaluate a snippet against `env`.
pub fn eval_script(code: &str, env: &ScriptEnv) -> Result<ScriptOutcome, EvalError> {
    let program = parse_program(code)?;
    let mut interp = Interp {
        env,
        effects: Vec::new(),
    };
    let mut last = Evaluated::Undefined;
    for expr in &program {
        last = interp.eval(expr)?;
    }
    Ok(ScriptOutcome {
        value: match last {
            Evaluated::Val(v) => Some(v),
            _ => None,
        },
        effects: interp.effects,
    })
}

/// Evaluate a binding-fallback snippet: injected snapshots only, effects
/// impossible. Returns `None` for `undefined`.
pub(crate) fn eval_snippet(code: &str, ctx: &EvalContext<'_>) -> Result<Option<Value>, EvalError> {
    let env = ScriptEnv::from_context(ctx);
    eval_script(code, &env).map(|outcome| outcome.value)
}

impl Interp<'_> {
    fn eval(&mut self, expr: &Expr) -> Result<Evaluated, EvalError> {
        match expr {
            Expr::Undefined => Ok(Evaluated::Undefined),
            Expr::Literal(v) => Ok(Evaluated::Val(v.clone())),
            Expr::Ident(name) => {
                if name == "helpers" && self.env.helpers {
                    return Ok(Evaluated::HelperNs);
                }
                match self.env.bindings.get(name) {
                    Some(v) => Ok(Evaluated::Val(v.clone())),
                    None => Err(EvalError::UnknownIdent(name.clone())),
                }
            }
            Expr::Member(base, name) => {
                let base = self.eval(base)?;
                self.member(base, name)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                match index {
                    Evaluated::Val(Value::Number(n)) => match base {
                        Evaluated::Val(Value::Array(items)) => {
                            let i = n.as_f64().unwrap_or(-1.0);
                            if i >= 0.0 && (i as usize) < items.len() {
                                Ok(Evaluated::Val(items[i as usize].clone()))
                            } else {
                                Ok(Evaluated::Undefined)
                            }
                        }
                        other => self.member(other, &n.to_string()),
                    },
                    Evaluated::Val(Value::String(key)) => self.member(base, &key),
                    _ => Ok(Evaluated::Undefined),
                }
            }
            Expr::Call(callee, args) => {
                let target = self.eval(callee)?;
                match target {
                    Evaluated::HelperFn(helper) => {
                        let mut evaluated = Vec::with_capacity(args.len());
                        for arg in args {
                            evaluated.push(self.eval(arg)?);
                        }
                        self.apply_helper(helper, evaluated)
                    }
                    _ => Err(EvalError::NotCallable(describe_callee(callee))),
                }
            }
            Expr::Unary(op, inner) => {
                let v = self.eval(inner)?;
                match op {
                    UnaryOp::Not => Ok(Evaluated::Val(Value::Bool(!truthy(&v)))),
                    UnaryOp::Neg => Ok(Evaluated::Val(num_value(-to_number(&v)?))),
                }
            }
            Expr::Binary(op, left, right) => match op {
                BinaryOp::And => {
                    let lv = self.eval(left)?;
                    if truthy(&lv) {
                        self.eval(right)
                    } else {
                        Ok(lv)
                    }
                }
                BinaryOp::Or => {
                    let lv = self.eval(left)?;
                    if truthy(&lv) {
                        Ok(lv)
                    } else {
                        self.eval(right)
                    }
                }
                _ => {
                    let lv = self.eval(left)?;
                    let rv = self.eval(right)?;
                    binary_op(*op, lv, rv)
                }
            },
            Expr::Ternary(cond, then, other) => {
                let c = self.eval(cond)?;
                if truthy(&c) {
                    self.eval(then)
                } else {
                    self.eval(other)
                }
            }
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(match self.eval(item)? {
                        Evaluated::Val(v) => v,
                        _ => Value::Null,
                    });
                }
                Ok(Evaluated::Val(Value::Array(out)))
            }
            Expr::Object(entries) => {
                let mut out = Map::new();
                for (key, value) in entries {
                    out.insert(
                        key.clone(),
                        match self.eval(value)? {
                            Evaluated::Val(v) => v,
                            _ => Value::Null,
                        },
                    );
                }
                Ok(Evaluated::Val(Value::Object(out)))
            }
        }
    }

    fn member(&self, base: Evaluated, name: &str) -> Result<Evaluated, EvalError> {
        match base {
            Evaluated::HelperNs => Ok(match name {
                "runApi" => Evaluated::HelperFn(Helper::RunApi),
                "runSqlQuery" => Evaluated::HelperFn(Helper::RunSqlQuery),
                "updateGlobalState" => Evaluated::HelperFn(Helper::UpdateGlobalState),
                "navigate" => Evaluated::HelperFn(Helper::Navigate),
                "showAlert" => Evaluated::HelperFn(Helper::ShowAlert),
                "copyToClipboard" => Evaluated::HelperFn(Helper::CopyToClipboard),
                "download" => Evaluated::HelperFn(Helper::Download),
                other => match self.env.collections.get(other) {
                    Some(v) => Evaluated::Val(v.clone()),
                    None => Evaluated::Undefined,
                },
            }),
            Evaluated::Val(Value::Object(map)) => Ok(map
                .get(name)
                .cloned()
                .map_or(Evaluated::Undefined, Evaluated::Val)),
            Evaluated::Val(Value::Array(items)) if name == "length" => {
                Ok(Evaluated::Val(Value::from(items.len())))
            }
            Evaluated::Val(Value::String(s)) if name == "length" => {
                Ok(Evaluated::Val(Value::from(s.chars().count())))
            }
            Evaluated::Val(Value::Null) | Evaluated::Undefined => Err(EvalError::Type(format!(
                "cannot read property `{name}` of null or undefined"
            ))),
            _ => Ok(Evaluated::Undefined),
        }
    }

    fn apply_helper(
        &mut self,
        helper: Helper,
        args: Vec<Evaluated>,
    ) -> Result<Evaluated, EvalError> {
        let arg_str = |i: usize| -> String {
            match args.get(i) {
                Some(Evaluated::Val(v)) => eval_display(&Evaluated::Val(v.clone())),
                _ => String::new(),
            }
        };
        match helper {
            Helper::RunApi => self.effects.push(Effect::RunApi(arg_str(0))),
            Helper::RunSqlQuery => self.effects.push(Effect::RunSqlQuery(arg_str(0))),
            Helper::UpdateGlobalState => {
                let value = match args.get(1) {
                    Some(Evaluated::Val(v)) => v.clone(),
                    _ => Value::Null,
                };
                self.effects.push(Effect::UpdateGlobalState {
                    key: arg_str(0),
                    value,
                });
            }
            Helper::Navigate => self.effects.push(Effect::Navigate { to: arg_str(0) }),
            Helper::ShowAlert => self.effects.push(Effect::ShowAlert {
                message: arg_str(0),
            }),
            Helper::CopyToClipboard => self
                .effects
                .push(Effect::CopyToClipboard { text: arg_str(0) }),
            Helper::Download => {
                let filename = match args.get(1) {
                    Some(Evaluated::Val(Value::String(s))) => Some(s.clone()),
                    _ => None,
                };
                self.effects.push(Effect::Download {
                    url: arg_str(0),
                    filename,
                });
            }
        }
        Ok(Evaluated::Undefined)
    }
}

fn describe_callee(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member(_, name) => name.clone(),
        _ => "expression".to_string(),
    }
}

// ─── Value semantics ─────────────────────────────────────────────────────

/// Fold a whole-number f64 into a JSON integer so `1 + 1` displays as `2`.
fn num_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_991.0 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn truthy(v: &Evaluated) -> bool {
    match v {
        Evaluated::Undefined => false,
        Evaluated::HelperNs | Evaluated::HelperFn(_) => true,
        Evaluated::Val(Value::Null) => false,
        Evaluated::Val(Value::Bool(b)) => *b,
        Evaluated::Val(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Evaluated::Val(Value::String(s)) => !s.is_empty(),
        Evaluated::Val(_) => true,
    }
}

fn to_number(v: &Evaluated) -> Result<f64, EvalError> {
    match v {
        Evaluated::Val(Value::Null) => Ok(0.0),
        Evaluated::Val(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Evaluated::Val(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| EvalError::Type("not a finite number".into())),
        Evaluated::Val(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| EvalError::Type(format!("{s:?} is not a number"))),
        _ => Err(EvalError::Type("not a number".into())),
    }
}

/// String()-style rendering used inside expressions (concat, helper args).
fn eval_display(v: &Evaluated) -> String {
    match v {
        Evaluated::Undefined => "undefined".to_string(),
        Evaluated::Val(Value::Null) => "null".to_string(),
        Evaluated::Val(other) => display_string(other),
        Evaluated::HelperNs | Evaluated::HelperFn(_) => String::new(),
    }
}

fn binary_op(op: BinaryOp, l: Evaluated, r: Evaluated) -> Result<Evaluated, EvalError> {
    use BinaryOp::*;
    let val = match op {
        Add => {
            let has_string = matches!(&l, Evaluated::Val(Value::String(_)))
                || matches!(&r, Evaluated::Val(Value::String(_)));
            if has_string {
                Value::String(format!("{}{}", eval_display(&l), eval_display(&r)))
            } else {
                num_value(to_number(&l)? + to_number(&r)?)
            }
        }
        Sub => num_value(to_number(&l)? - to_number(&r)?),
        Mul => num_value(to_number(&l)? * to_number(&r)?),
        Div => {
            let b = to_number(&r)?;
            if b == 0.0 {
                return Err(EvalError::Type("division by zero".into()));
            }
            num_value(to_number(&l)? / b)
        }
        Mod => {
            let b = to_number(&r)?;
            if b == 0.0 {
                return Err(EvalError::Type("division by zero".into()));
            }
            num_value(to_number(&l)? % b)
        }
        Eq => Value::Bool(loose_eq(&l, &r)),
        Ne => Value::Bool(!loose_eq(&l, &r)),
        StrictEq => Value::Bool(strict_eq(&l, &r)),
        StrictNe => Value::Bool(!strict_eq(&l, &r)),
        Lt | Le | Gt | Ge => {
            let ordering = compare(&l, &r)?;
            Value::Bool(match op {
                Lt => ordering.is_lt(),
                Le => ordering.is_le(),
                Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        And | Or => unreachable!("short-circuit ops handled by the interpreter"),
    };
    Ok(Evaluated::Val(val))
}

fn is_nullish(v: &Evaluated) -> bool {
    matches!(v, Evaluated::Undefined | Evaluated::Val(Value::Null))
}

fn loose_eq(l: &Evaluated, r: &Evaluated) -> bool {
    if is_nullish(l) || is_nullish(r) {
        return is_nullish(l) && is_nullish(r);
    }
    match (l, r) {
        (Evaluated::Val(a), Evaluated::Val(b)) => {
            if std::mem::discriminant(a) == std::mem::discriminant(b) {
                a == b
            } else {
                // Mixed primitives compare numerically when both coerce
                match (to_number(l), to_number(r)) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
            }
        }
        _ => false,
    }
}

fn strict_eq(l: &Evaluated, r: &Evaluated) -> bool {
    match (l, r) {
        (Evaluated::Undefined, Evaluated::Undefined) => true,
        (Evaluated::Val(a), Evaluated::Val(b)) => {
            std::mem::discriminant(a) == std::mem::discriminant(b) && a == b
        }
        _ => false,
    }
}

fn compare(l: &Evaluated, r: &Evaluated) -> Result<std::cmp::Ordering, EvalError> {
    if let (Evaluated::Val(Value::String(a)), Evaluated::Val(Value::String(b))) = (l, r) {
        return Ok(a.cmp(b));
    }
    let a = to_number(l)?;
    let b = to_number(r)?;
    a.partial_cmp(&b)
        .ok_or_else(|| EvalError::Type("values are not comparable".into()))
}
