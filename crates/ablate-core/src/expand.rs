//! Ablation sweep expansion.
//!
//! Operates on the raw configuration value, before validation: one enabled
//! description expands into the full cross-product of its declared factors,
//! each result identical to the input except for the swept paths.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, ConfigResult};

/// Expand a raw configuration into concrete sweep members.
///
/// With `ablation.use_ablate` absent or false this is the identity: a single
/// element containing the input unchanged. Enumeration order is stable:
/// factors in lexicographic path order, candidate values in declared order.
pub fn expand_ablation(raw: &Value) -> ConfigResult<Vec<Value>> {
    if !ablation_enabled(raw) {
        return Ok(vec![raw.clone()]);
    }

    let factors = sweep_factors(raw)?;
    let mut combos = Vec::new();
    expand_grid(&factors, 0, BTreeMap::new(), &mut combos);

    let mut out = Vec::with_capacity(combos.len());
    for combo in combos {
        let mut concrete = raw.clone();
        for (path, value) in combo {
            set_path(&mut concrete, &path, &path, value)?;
        }
        out.push(concrete);
    }
    Ok(out)
}

fn ablation_enabled(raw: &Value) -> bool {
    raw.get("ablation")
        .and_then(|a| a.get("use_ablate"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn sweep_factors(raw: &Value) -> ConfigResult<BTreeMap<String, Vec<Value>>> {
    let mut factors = BTreeMap::new();
    let Some(declared) = raw.get("ablation").and_then(|a| a.get("factors")) else {
        return Ok(factors);
    };
    let mapping = declared.as_mapping().ok_or_else(|| {
        ConfigError::Expansion("ablation.factors must be a mapping of parameter paths".to_string())
    })?;

    for (key, value) in mapping {
        let path = key
            .as_str()
            .ok_or_else(|| {
                ConfigError::Expansion("ablation.factors keys must be dotted parameter paths".to_string())
            })?
            .to_string();
        if path.trim().is_empty() {
            return Err(ConfigError::Expansion("empty factor path".to_string()));
        }
        let candidates = value
            .as_sequence()
            .ok_or_else(|| {
                ConfigError::Expansion(format!("factor `{path}` must be a list of candidate values"))
            })?
            .clone();
        if candidates.is_empty() {
            return Err(ConfigError::EmptySweep(format!("factor `{path}` has no candidate values")));
        }
        factors.insert(path, candidates);
    }
    Ok(factors)
}

fn expand_grid(
    factors: &BTreeMap<String, Vec<Value>>,
    depth: usize,
    current: BTreeMap<String, Value>,
    outputs: &mut Vec<BTreeMap<String, Value>>,
) {
    if depth == factors.len() {
        outputs.push(current);
        return;
    }
    if let Some((path, candidates)) = factors.iter().nth(depth) {
        for candidate in candidates {
            let mut next = current.clone();
            next.insert(path.clone(), candidate.clone());
            expand_grid(factors, depth + 1, next, outputs);
        }
    }
}

/// Override the value at a dotted path, creating intermediate mappings.
fn set_path(node: &mut Value, full: &str, rest: &str, value: Value) -> ConfigResult<()> {
    let (head, tail) = match rest.split_once('.') {
        Some((head, tail)) => (head, Some(tail)),
        None => (rest, None),
    };
    let mapping = node.as_mapping_mut().ok_or_else(|| {
        ConfigError::Expansion(format!("cannot override `{full}`: `{head}` is not reachable through a mapping"))
    })?;
    let key = Value::String(head.to_string());
    match tail {
        None => {
            mapping.insert(key, value);
            Ok(())
        }
        Some(tail) => {
            let child = mapping.entry(key).or_insert_with(|| Value::Mapping(Mapping::new()));
            set_path(child, full, tail, value)
        }
    }
}
