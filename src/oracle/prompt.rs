//! Builds the oracle request for one synthesis attempt.

use std::fmt::Write as _;

use super::response::NO_VALUE_SENTINEL;
use super::OracleRequest;
use crate::constraint::{format_number, json_kind, CandidateDefinition, Constraint, ConstraintSpec};
use crate::predicate::PredicateRegistryEntry;

fn system_instruction() -> String {
    format!(
        r#"You produce concrete JSON values that satisfy a bundle of constraints.

Respond with a single JSON object and nothing else:
{{
  "value": <the proposed value>,
  "heuristics": [{{"name": "...", "description": "...", "predicate": "x => ..."}}],
  "candidateValidators": [{{"name": "...", "description": "...", "predicate": "x => ..."}}],
  "explanation": "..."
}}

Predicates are single-parameter arrow functions over the value using only
comparisons, arithmetic, typeof, Number.isInteger, Array.isArray, Math.*,
string and array methods. No statements, loops or assignment.
Prefer reusing the registered predicates listed in the request over inventing
new ones. If no value can satisfy every hard constraint, set "explanation" to
start with {sentinel} and say why."#,
        sentinel = NO_VALUE_SENTINEL
    )
}

/// Assembles an [`OracleRequest`] from everything known about a bundle.
pub struct PromptBuilder<'a> {
    type_text: &'a str,
    spec: &'a ConstraintSpec,
    constraints: &'a [Constraint],
    heuristics: &'a [CandidateDefinition],
    registered: &'a [PredicateRegistryEntry],
    feedback: Option<&'a str>,
    context: Option<&'a str>,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(type_text: &'a str, spec: &'a ConstraintSpec) -> Self {
        Self {
            type_text,
            spec,
            constraints: &[],
            heuristics: &[],
            registered: &[],
            feedback: None,
            context: None,
        }
    }

    /// The accumulated constraint set the value must satisfy.
    pub fn constraints(mut self, constraints: &'a [Constraint]) -> Self {
        self.constraints = constraints;
        self
    }

    /// Heuristics discovered in earlier runs or attempts.
    pub fn heuristics(mut self, heuristics: &'a [CandidateDefinition]) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn registered(mut self, registered: &'a [PredicateRegistryEntry]) -> Self {
        self.registered = registered;
        self
    }

    pub fn feedback(mut self, feedback: Option<&'a str>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn context(mut self, context: Option<&'a str>) -> Self {
        self.context = context;
        self
    }

    pub fn build(&self) -> OracleRequest {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Bundle: {}", self.type_text);

        if let Some(context) = self.context.filter(|c| !c.trim().is_empty()) {
            let _ = writeln!(prompt, "\nContext:\n{}", context.trim());
        }

        prompt.push_str("\nMust satisfy:\n");
        if self.constraints.is_empty() {
            prompt.push_str("- (no derived constraints; infer them from the bundle and examples)\n");
        }
        for constraint in self.constraints {
            let _ = write!(prompt, "- {}", constraint.description());
            if let Some(source) = constraint.predicate_source() {
                let _ = write!(prompt, "  [{}]", source);
            }
            prompt.push('\n');
        }

        if !self.spec.suggested.is_empty() {
            prompt.push_str("\nSuggested (soft):\n");
            for requirement in &self.spec.suggested {
                let _ = writeln!(prompt, "- {}", requirement.description);
            }
        }

        match (self.spec.minimum, self.spec.maximum) {
            (None, None) => {}
            (min, max) => {
                let fmt = |b: Option<f64>| b.map(format_number).unwrap_or_else(|| "-".to_string());
                let _ = writeln!(prompt, "\nBounds: minimum {}, maximum {}", fmt(min), fmt(max));
            }
        }

        if !self.spec.examples.is_empty() {
            let rendered: Vec<String> = self.spec.examples.iter().map(|e| e.to_string()).collect();
            let kind = json_kind(&self.spec.examples[0]);
            let _ = writeln!(
                prompt,
                "\nIllustrative examples ({}): {}\nGeneralize from them; do not copy them.",
                kind,
                rendered.join(", ")
            );
        }

        if !self.heuristics.is_empty() {
            prompt.push_str("\nPreviously discovered heuristics:\n");
            for h in self.heuristics {
                let _ = writeln!(prompt, "- {}: {} [{}]", h.name, h.description, h.predicate_source);
            }
        }

        if !self.registered.is_empty() {
            prompt.push_str("\nRegistered predicates (reuse these):\n");
            for entry in self.registered {
                let _ = writeln!(prompt, "- {} {}: {}", entry.id, entry.name, entry.predicate_source);
            }
        }

        if let Some(feedback) = self.feedback {
            let _ = writeln!(prompt, "\nThe previous attempt was rejected:\n{}", feedback);
        }

        OracleRequest::new(system_instruction(), prompt)
    }
}
