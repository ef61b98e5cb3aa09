//! Permissive parsing and strict validation of oracle responses.

use serde_json::{Map, Value};

use crate::constraint::CandidateDefinition;
use crate::error::{Error, Result};

/// Explanation marker the oracle uses to declare that no value exists.
pub const NO_VALUE_SENTINEL: &str = "NO_VALUE_EXISTS";

/// A proposal parsed out of an oracle response.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleProposal {
    pub value: Value,
    pub heuristics: Vec<CandidateDefinition>,
    pub candidate_validators: Vec<CandidateDefinition>,
    pub explanation: Option<String>,
}

/// What the oracle said.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    Proposal(OracleProposal),
    /// The oracle claims no value satisfies the bundle.
    Infeasible { explanation: String },
}

/// Parse raw oracle text.
///
/// Markdown fences and surrounding prose are tolerated; a missing `value` or a
/// malformed heuristic/candidate is a [`Error::ResponseParse`].
pub fn parse_response(text: &str) -> Result<OracleReply> {
    let json = extract_json(text)?;
    let Value::Object(mut obj) = json else {
        return Err(Error::ResponseParse("response is not a JSON object".to_string()));
    };

    let explanation = match obj.remove("explanation") {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };
    if let Some(explanation) = explanation.as_deref() {
        if explanation.contains(NO_VALUE_SENTINEL) {
            return Ok(OracleReply::Infeasible {
                explanation: explanation.to_string(),
            });
        }
    }

    let value = obj
        .remove("value")
        .ok_or_else(|| Error::ResponseParse("response has no 'value' field".to_string()))?;

    let heuristics = definitions(&mut obj, "heuristics")?
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| -> Result<CandidateDefinition> {
            let name = non_empty(&raw, "name")
                .ok_or_else(|| Error::ResponseParse(format!("heuristic {} has no name", idx)))?;
            let predicate = non_empty(&raw, "predicate").ok_or_else(|| {
                Error::ResponseParse(format!("heuristic '{}' has no predicate", name))
            })?;
            Ok(CandidateDefinition::new(
                name,
                non_empty(&raw, "description").unwrap_or_default(),
                predicate,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let candidate_validators = definitions(&mut obj, "candidateValidators")?
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| -> Result<CandidateDefinition> {
            let predicate = non_empty(&raw, "predicate").ok_or_else(|| {
                Error::ResponseParse(format!("candidate validator {} has no predicate", idx))
            })?;
            Ok(CandidateDefinition::new(
                non_empty(&raw, "name").unwrap_or_else(|| format!("candidate_{}", idx)),
                non_empty(&raw, "description").unwrap_or_default(),
                predicate,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(OracleReply::Proposal(OracleProposal {
        value,
        heuristics,
        candidate_validators,
        explanation,
    }))
}

fn extract_json(text: &str) -> Result<Value> {
    let stripped = strip_fences(text);
    match serde_json::from_str(stripped) {
        Ok(v) => Ok(v),
        Err(first) => {
            // Fall back to the outermost braces when the oracle wrapped JSON in prose.
            let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) else {
                return Err(Error::ResponseParse(format!("invalid JSON: {}", first)));
            };
            if end < start {
                return Err(Error::ResponseParse(format!("invalid JSON: {}", first)));
            }
            serde_json::from_str(&stripped[start..=end])
                .map_err(|e| Error::ResponseParse(format!("invalid JSON: {}", e)))
        }
    }
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn definitions(obj: &mut Map<String, Value>, key: &str) -> Result<Vec<Map<String, Value>>> {
    match obj.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(map) => Ok(map),
                _ => Err(Error::ResponseParse(format!("{}[{}] is not an object", key, idx))),
            })
            .collect(),
        Some(_) => Err(Error::ResponseParse(format!("'{}' is not an array", key))),
    }
}

fn non_empty(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
