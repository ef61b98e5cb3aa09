//! Constraint Model: typed boolean tests with provenance.
//!
//! Constraints are either *inferred* from the bundle description
//! ([`derive_from_component`]) or *heuristic*, compiled from a predicate the
//! oracle discovered ([`compile_heuristic`]). A working set is built with
//! [`merge`] and checked with [`validate_value`], which reports every failing
//! description rather than the first.

mod derive;
mod types;
mod validate;

pub use derive::derive_from_component;
pub(crate) use derive::{format_number, json_kind};
pub use types::{
    CandidateDefinition, ComponentSpec, Constraint, ConstraintRecord, ConstraintSource,
    ConstraintSpec, ConstraintTest, Requirement,
};
pub use validate::{compile_heuristic, merge, validate_value};
