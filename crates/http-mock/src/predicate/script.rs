//! Custom predicates written in Rhai.
//!
//! Rule sets travel to the server as data, so a custom predicate is a script
//! rather than a closure. The script runs with two variables in scope:
//!
//! - `value`: the extracted value as a string, or `()` when absent
//! - `request`: a map with `method`, `path`, `headers`, `query` and `body`
//!
//! It must evaluate to a boolean. Runtime errors and non-boolean results are
//! logged and treated as "no match".

use crate::request::RecordedRequest;
use rhai::{Dynamic, Engine, Map, Scope, AST};
use std::fmt;
use tracing::warn;

/// Upper bound on operations per evaluation; evaluation runs under the state lock.
const MAX_OPERATIONS: u64 = 100_000;

pub struct ScriptPredicate {
    engine: Engine,
    ast: AST,
    source: String,
}

impl ScriptPredicate {
    pub fn compile(source: &str) -> Result<Self, String> {
        let engine = Self::create_engine();
        let ast = engine
            .compile(source)
            .map_err(|e| format!("Failed to compile script: {e}"))?;
        Ok(Self {
            engine,
            ast,
            source: source.to_string(),
        })
    }

    fn create_engine() -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);
        engine
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, value: Option<&str>, request: &RecordedRequest) -> bool {
        let mut scope = Scope::new();
        scope.push_dynamic(
            "value",
            value.map_or(Dynamic::UNIT, |v| Dynamic::from(v.to_string())),
        );
        scope.push("request", request_map(request));

        match self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
        {
            Ok(result) => match result.as_bool() {
                Ok(matched) => matched,
                Err(type_name) => {
                    warn!(
                        "Custom predicate returned {} instead of bool: {}",
                        type_name, self.source
                    );
                    false
                }
            },
            Err(e) => {
                warn!("Custom predicate failed: {} ({})", e, self.source);
                false
            }
        }
    }
}

impl fmt::Debug for ScriptPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptPredicate")
            .field("source", &self.source)
            .finish()
    }
}

fn request_map(request: &RecordedRequest) -> Map {
    let mut map = Map::new();
    map.insert("method".into(), Dynamic::from(request.method.clone()));
    map.insert("path".into(), Dynamic::from(request.path.clone()));

    // Header names are lowercased so scripts need not guess the casing
    let mut headers = Map::new();
    for (name, value) in request.headers.iter() {
        headers
            .entry(name.to_ascii_lowercase().into())
            .or_insert_with(|| Dynamic::from(value.to_string()));
    }
    map.insert("headers".into(), Dynamic::from(headers));

    let mut query = Map::new();
    for (name, value) in &request.query {
        query
            .entry(name.as_str().into())
            .or_insert_with(|| Dynamic::from(value.clone()));
    }
    map.insert("query".into(), Dynamic::from(query));

    map.insert("body".into(), Dynamic::from(request.body_text()));
    map
}
