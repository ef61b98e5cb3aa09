//! Sandboxed predicate compilation and the content-addressed predicate registry.
//!
//! Oracle-discovered validators arrive as untrusted source text. This module
//! is the only place that text becomes executable: a restricted, side-effect
//! free expression language (single-parameter arrow functions over JSON
//! values) is tokenized, parsed and interpreted. Nothing here can touch the
//! filesystem, network or process state, and every evaluation terminates.
//!
//! ## Example
//!
//! ```rust
//! use constraint_synth::predicate::compile_predicate;
//! use serde_json::json;
//!
//! let even = compile_predicate("x => Number.isInteger(x) && x % 2 === 0").unwrap();
//! assert!(even.test(&json!(102)));
//! assert!(!even.test(&json!(7)));
//! assert!(compile_predicate("x => { while (true) {} }").is_err());
//! ```

mod eval;
mod lexer;
mod parser;
mod registry;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use eval::{Evaluator, JsValue};
use lexer::Lexer;
use parser::{Parser, PredicateAst};

pub use parser::{IMPLICIT_PARAM, MAX_DEPTH};
pub use registry::{
    predicate_id, PredicateRegistry, PredicateRegistryEntry, RegistrySnapshot,
    SharedPredicateRegistry,
};
pub(crate) use registry::expand_path;

/// Errors raised while compiling or evaluating predicate source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredicateError {
    /// Source contains characters or tokens outside the language
    #[error("lex error at {offset}: {message}")]
    Lex { offset: usize, message: String },

    /// Tokens do not form a supported predicate
    #[error("parse error at {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// Runtime failure (unknown identifier, call on a non-function, ...)
    #[error("evaluation error: {message}")]
    Eval { message: String },
}

impl PredicateError {
    pub fn lex(offset: usize, message: impl Into<String>) -> Self {
        Self::Lex {
            offset,
            message: message.into(),
        }
    }

    pub fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }
}

/// A predicate that compiled successfully.
///
/// Cheap to clone; the AST is shared.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    source: String,
    ast: Arc<PredicateAst>,
}

impl CompiledPredicate {
    /// Original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Name of the bound parameter.
    pub fn param(&self) -> &str {
        &self.ast.param
    }

    /// Evaluate against a value, surfacing runtime errors.
    pub fn evaluate(&self, value: &Value) -> Result<bool, PredicateError> {
        let mut evaluator = Evaluator::new(&self.ast.param, JsValue::from(value));
        Ok(evaluator.eval(&self.ast.body)?.truthy())
    }

    /// Evaluate against a value; runtime errors count as a failed test.
    pub fn test(&self, value: &Value) -> bool {
        self.evaluate(value).unwrap_or(false)
    }
}

/// Compile predicate source into a callable, or fail without side effects.
pub fn compile_predicate(source: &str) -> Result<CompiledPredicate, PredicateError> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(PredicateError::parse(0, "empty predicate"));
    }
    let tokens = Lexer::new(trimmed).tokenize()?;
    let ast = Parser::new(tokens).parse_predicate()?;
    Ok(CompiledPredicate {
        source: source.to_string(),
        ast: Arc::new(ast),
    })
}
