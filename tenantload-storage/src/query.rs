//! Filter matching and aggregation for the in-memory store
//!
//! Supports the subset of the document query language the workload uses:
//! equality filters over dotted paths (with `$eq`, `$ne`, `$in`), and the
//! pipeline stages `$match`, `$unwind`, `$group`, `$sort`, `$skip` and
//! `$limit`. Anything else is rejected as a permanent error.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use tenantload_interfaces::BackendError;

static NULL: Value = Value::Null;

fn unsupported(message: impl Into<String>) -> BackendError {
    BackendError::Unsupported {
        message: message.into(),
    }
}

/// Every value reachable through `path`, descending into arrays on the way
pub fn resolve_path<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(child) = map.get(segment) {
                        next.push(child);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(child) = item.as_object().and_then(|m| m.get(segment)) {
                            next.push(child);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

/// Equality with numeric coercion, so `3` equals `3.0`
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Total order used by `$sort`: null < numbers < strings < everything else
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn field_equals(candidates: &[&Value], expected: &Value) -> bool {
    candidates.iter().any(|value| {
        values_equal(value, expected)
            || value
                .as_array()
                .map(|items| items.iter().any(|item| values_equal(item, expected)))
                .unwrap_or(false)
    })
}

fn is_operator_object(value: &Value) -> bool {
    value
        .as_object()
        .map(|m| !m.is_empty() && m.keys().all(|k| k.starts_with('$')))
        .unwrap_or(false)
}

/// Whether `doc` satisfies `filter`
pub fn matches(doc: &Value, filter: &Value) -> Result<bool, BackendError> {
    let conditions = match filter {
        Value::Null => return Ok(true),
        Value::Object(map) => map,
        other => return Err(unsupported(format!("filter must be an object, got {}", other))),
    };

    for (path, expected) in conditions {
        if path.starts_with('$') {
            return Err(unsupported(format!("top-level operator {}", path)));
        }
        let candidates = resolve_path(doc, path);

        let satisfied = if is_operator_object(expected) {
            let mut all = true;
            for (op, operand) in expected.as_object().into_iter().flatten() {
                let ok = match op.as_str() {
                    "$eq" => field_equals(&candidates, operand),
                    "$ne" => !field_equals(&candidates, operand),
                    "$in" => {
                        let options = operand
                            .as_array()
                            .ok_or_else(|| unsupported("$in expects an array"))?;
                        options.iter().any(|option| field_equals(&candidates, option))
                    }
                    other => return Err(unsupported(format!("query operator {}", other))),
                };
                all &= ok;
            }
            all
        } else {
            field_equals(&candidates, expected)
        };

        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate an aggregation expression: `"$path"` is a field reference, anything else a literal
fn evaluate(doc: &Value, expr: &Value) -> Value {
    match expr {
        Value::String(s) if s.starts_with('$') => resolve_path(doc, &s[1..])
            .first()
            .map(|v| (*v).clone())
            .unwrap_or(Value::Null),
        Value::Object(map) if !is_operator_object(expr) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), evaluate(doc, v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn field_reference(spec: &Value, stage: &str) -> Result<String, BackendError> {
    let path = match spec {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| unsupported(format!("{} requires a path", stage)))?,
        _ => return Err(unsupported(format!("{} requires a field path", stage))),
    };
    path.strip_prefix('$')
        .map(str::to_string)
        .ok_or_else(|| unsupported(format!("{} path must start with $", stage)))
}

fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = doc;
    while let Some(segment) = segments.next() {
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn unwind(docs: Vec<Value>, spec: &Value) -> Result<Vec<Value>, BackendError> {
    let path = field_reference(spec, "$unwind")?;
    let mut out = Vec::with_capacity(docs.len());

    for doc in docs {
        let target = resolve_path(&doc, &path).first().map(|v| (*v).clone());
        match target {
            Some(Value::Array(items)) => {
                for item in items {
                    let mut copy = doc.clone();
                    set_path(&mut copy, &path, item);
                    out.push(copy);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => out.push(doc),
        }
    }
    Ok(out)
}

#[derive(Debug)]
enum Accumulator {
    Sum { int: i64, float: f64, all_int: bool },
    Avg { total: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    Count(u64),
}

impl Accumulator {
    fn new(op: &str) -> Result<Self, BackendError> {
        Ok(match op {
            "$sum" => Accumulator::Sum {
                int: 0,
                float: 0.0,
                all_int: true,
            },
            "$avg" => Accumulator::Avg {
                total: 0.0,
                count: 0,
            },
            "$min" => Accumulator::Min(None),
            "$max" => Accumulator::Max(None),
            "$count" => Accumulator::Count(0),
            other => return Err(unsupported(format!("accumulator {}", other))),
        })
    }

    fn add(&mut self, value: Value) {
        match self {
            Accumulator::Sum {
                int,
                float,
                all_int,
            } => {
                if let Value::Number(n) = &value {
                    match n.as_i64() {
                        Some(i) if *all_int => *int += i,
                        _ => {
                            if *all_int {
                                *float = *int as f64;
                                *all_int = false;
                            }
                            *float += n.as_f64().unwrap_or(0.0);
                        }
                    }
                }
            }
            Accumulator::Avg { total, count } => {
                if let Some(n) = value.as_f64() {
                    *total += n;
                    *count += 1;
                }
            }
            Accumulator::Min(current) => {
                if !value.is_null()
                    && current
                        .as_ref()
                        .map(|c| compare_values(&value, c) == Ordering::Less)
                        .unwrap_or(true)
                {
                    *current = Some(value);
                }
            }
            Accumulator::Max(current) => {
                if !value.is_null()
                    && current
                        .as_ref()
                        .map(|c| compare_values(&value, c) == Ordering::Greater)
                        .unwrap_or(true)
                {
                    *current = Some(value);
                }
            }
            Accumulator::Count(count) => *count += 1,
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Sum {
                int,
                float,
                all_int,
            } => {
                if all_int {
                    Value::from(int)
                } else {
                    Number::from_f64(float).map(Value::Number).unwrap_or(Value::Null)
                }
            }
            Accumulator::Avg { total, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Number::from_f64(total / count as f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
            Accumulator::Min(v) | Accumulator::Max(v) => v.unwrap_or(Value::Null),
            Accumulator::Count(count) => Value::from(count),
        }
    }
}

fn group(docs: Vec<Value>, spec: &Value) -> Result<Vec<Value>, BackendError> {
    let spec = spec
        .as_object()
        .ok_or_else(|| unsupported("$group expects an object"))?;
    let id_expr = spec
        .get("_id")
        .ok_or_else(|| unsupported("$group requires an _id"))?;

    let mut fields = Vec::new();
    for (name, acc) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
        let (op, expr) = acc
            .as_object()
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next())
            .ok_or_else(|| unsupported(format!("$group field {} needs one accumulator", name)))?;
        Accumulator::new(op)?;
        fields.push((name.clone(), op.clone(), expr.clone()));
    }

    // Groups keep first-seen order
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<Accumulator>)> = Vec::new();

    for doc in &docs {
        let key = evaluate(doc, id_expr);
        let slot = match index.get(&key.to_string()) {
            Some(slot) => *slot,
            None => {
                let accs = fields
                    .iter()
                    .map(|(_, op, _)| Accumulator::new(op))
                    .collect::<Result<Vec<_>, _>>()?;
                index.insert(key.to_string(), groups.len());
                groups.push((key, accs));
                groups.len() - 1
            }
        };
        for ((_, _, expr), acc) in fields.iter().zip(groups[slot].1.iter_mut()) {
            acc.add(evaluate(doc, expr));
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, accs)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), key);
            for ((name, _, _), acc) in fields.iter().zip(accs) {
                out.insert(name.clone(), acc.finish());
            }
            Value::Object(out)
        })
        .collect())
}

fn sort(mut docs: Vec<Value>, spec: &Value) -> Result<Vec<Value>, BackendError> {
    let spec = spec
        .as_object()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| unsupported("$sort expects a non-empty object"))?;

    let mut keys = Vec::with_capacity(spec.len());
    for (path, direction) in spec {
        let descending = match direction.as_i64() {
            Some(1) => false,
            Some(-1) => true,
            _ => return Err(unsupported(format!("$sort direction for {} must be 1 or -1", path))),
        };
        keys.push((path.clone(), descending));
    }

    docs.sort_by(|a, b| {
        for (path, descending) in &keys {
            let left = resolve_path(a, path).first().copied().unwrap_or(&NULL);
            let right = resolve_path(b, path).first().copied().unwrap_or(&NULL);
            let ordering = compare_values(left, right);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(docs)
}

fn count_arg(spec: &Value, stage: &str) -> Result<usize, BackendError> {
    spec.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| unsupported(format!("{} expects a non-negative integer", stage)))
}

/// Run `pipeline` over `docs`
pub fn aggregate(docs: Vec<Value>, pipeline: &[Value]) -> Result<Vec<Value>, BackendError> {
    let mut current = docs;

    for stage in pipeline {
        let (name, spec) = stage
            .as_object()
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next())
            .ok_or_else(|| unsupported("each pipeline stage must have exactly one operator"))?;

        current = match name.as_str() {
            "$match" => {
                let mut kept = Vec::with_capacity(current.len());
                for doc in current {
                    if matches(&doc, spec)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$unwind" => unwind(current, spec)?,
            "$group" => group(current, spec)?,
            "$sort" => sort(current, spec)?,
            "$skip" => current.into_iter().skip(count_arg(spec, "$skip")?).collect(),
            "$limit" => {
                let limit = count_arg(spec, "$limit")?;
                if limit == 0 {
                    return Err(unsupported("$limit must be positive"));
                }
                current.into_iter().take(limit).collect()
            }
            other => return Err(unsupported(format!("pipeline stage {}", other))),
        };
    }

    Ok(current)
}
