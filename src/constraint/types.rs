//! Constraint and candidate-definition types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boolean test applied to a candidate value.
pub type ConstraintTest = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Where a constraint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSource {
    /// Derived from the bundle description without the oracle.
    Inferred,
    /// Compiled from an oracle-discovered predicate.
    Heuristic,
}

impl fmt::Display for ConstraintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inferred => write!(f, "inferred"),
            Self::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// A named, described boolean test with provenance.
///
/// Immutable once built; a newer constraint with the same name supersedes it
/// through [`merge`](super::merge) rather than mutating it.
#[derive(Clone)]
pub struct Constraint {
    name: String,
    description: String,
    test: ConstraintTest,
    predicate_source: Option<String>,
    predicate_id: Option<String>,
    source: ConstraintSource,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        source: ConstraintSource,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            test: Arc::new(test),
            predicate_source: None,
            predicate_id: None,
            source,
        }
    }

    /// Build from an already-shared test closure.
    pub fn from_test(
        name: impl Into<String>,
        description: impl Into<String>,
        source: ConstraintSource,
        test: ConstraintTest,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            test,
            predicate_source: None,
            predicate_id: None,
            source,
        }
    }

    /// Attach the predicate source and registry id this constraint was compiled from.
    pub fn with_predicate(mut self, source: impl Into<String>, id: impl Into<String>) -> Self {
        self.predicate_source = Some(source.into());
        self.predicate_id = Some(id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source(&self) -> ConstraintSource {
        self.source
    }

    pub fn predicate_source(&self) -> Option<&str> {
        self.predicate_source.as_deref()
    }

    pub fn predicate_id(&self) -> Option<&str> {
        self.predicate_id.as_deref()
    }

    /// Run the test.
    pub fn check(&self, value: &Value) -> bool {
        (self.test)(value)
    }

    /// Serializable description of this constraint (the test itself is not persisted).
    pub fn to_record(&self) -> ConstraintRecord {
        ConstraintRecord {
            name: self.name.clone(),
            description: self.description.clone(),
            predicate_source: self.predicate_source.clone(),
            predicate_id: self.predicate_id.clone(),
            source: self.source,
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("source", &self.source)
            .field("predicate_id", &self.predicate_id)
            .finish_non_exhaustive()
    }
}

/// Persisted form of a [`Constraint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintRecord {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate_id: Option<String>,
    pub source: ConstraintSource,
}

/// A proposed validator: untrusted until scored or validated.
///
/// Oracle heuristics and candidate validators share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDefinition {
    pub name: String,
    pub description: String,
    pub predicate_source: String,
}

impl CandidateDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        predicate_source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            predicate_source: predicate_source.into(),
        }
    }
}

/// A hard or soft requirement handed over by the bundle-extraction collaborator.
#[derive(Clone)]
pub struct Requirement {
    pub description: String,
    pub test: ConstraintTest,
}

impl Requirement {
    pub fn new(
        description: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// One component of a bundle, e.g. `Even` or `GreaterThanX(100)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Numeric argument at `idx`, if present.
    pub fn numeric_argument(&self, idx: usize) -> Option<f64> {
        self.arguments.get(idx).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    }
}

/// Decomposed constraint specification of one bundle.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSpec {
    pub components: Vec<ComponentSpec>,
    /// Hard requirements; a result must satisfy all of them.
    pub must: Vec<Requirement>,
    /// Soft patterns shown to the oracle but never enforced.
    pub suggested: Vec<Requirement>,
    /// Illustrative example values.
    pub examples: Vec<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl ConstraintSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, component: ComponentSpec) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_must(mut self, requirement: Requirement) -> Self {
        self.must.push(requirement);
        self
    }

    pub fn with_suggested(mut self, requirement: Requirement) -> Self {
        self.suggested.push(requirement);
        self
    }

    pub fn with_examples(mut self, examples: impl IntoIterator<Item = Value>) -> Self {
        self.examples.extend(examples);
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }
}
