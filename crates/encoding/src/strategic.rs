//! Two-way strategic merge patches over untyped object JSON.
//!
//! Lists merge element-wise when the kind's metadata declares a merge key
//! for their path; removals become `{"$patch": "delete", <key>: v}`
//! directives. With an empty metadata table the engine degrades to plain
//! JSON merge-patch semantics (lists replace wholesale, `null` deletes a
//! field), which is the fallback for kinds without a registered schema.

use kectl_core::Error;
use serde_json::{Map, Value};

pub const PATCH_DIRECTIVE: &str = "$patch";

/// Merge-key metadata for one kind: dotted field paths (array levels do not
/// contribute segments) mapped to the key that identifies list elements.
#[derive(Debug, Clone, Default)]
pub struct PatchMeta {
    keys: Vec<(String, String)>,
}

impl PatchMeta {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            keys: pairs.iter().map(|(p, k)| (p.to_string(), k.to_string())).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn merge_key(&self, path: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, k)| k.as_str())
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

/// Compute the patch that turns `original` into `modified`.
pub fn create_two_way_patch(original: &Value, modified: &Value, meta: &PatchMeta) -> Value {
    match (original, modified) {
        (Value::Object(orig), Value::Object(modif)) => {
            Value::Object(diff_object(orig, modif, "", meta))
        }
        _ => modified.clone(),
    }
}

fn diff_object(orig: &Map<String, Value>, modif: &Map<String, Value>, path: &str, meta: &PatchMeta) -> Map<String, Value> {
    let mut patch = Map::new();
    for (field, m) in modif {
        let child = join(path, field);
        match orig.get(field) {
            None => {
                patch.insert(field.clone(), m.clone());
            }
            Some(o) if o == m => {}
            Some(o) => match (o, m) {
                (Value::Object(oo), Value::Object(mo)) => {
                    let sub = diff_object(oo, mo, &child, meta);
                    if !sub.is_empty() {
                        patch.insert(field.clone(), Value::Object(sub));
                    }
                }
                (Value::Array(oa), Value::Array(ma)) => {
                    match meta.merge_key(&child).and_then(|key| diff_list(oa, ma, key, &child, meta)) {
                        Some(sub) => {
                            if !sub.is_empty() {
                                patch.insert(field.clone(), Value::Array(sub));
                            }
                        }
                        None => {
                            patch.insert(field.clone(), m.clone());
                        }
                    }
                }
                _ => {
                    patch.insert(field.clone(), m.clone());
                }
            },
        }
    }
    for field in orig.keys() {
        if !modif.contains_key(field) {
            patch.insert(field.clone(), Value::Null);
        }
    }
    patch
}

// Diff two keyed lists. Returns None when any element lacks the merge key,
// in which case the caller falls back to replacing the list.
fn diff_list(orig: &[Value], modif: &[Value], key: &str, path: &str, meta: &PatchMeta) -> Option<Vec<Value>> {
    if orig.iter().chain(modif).any(|e| e.get(key).is_none()) {
        return None;
    }

    let mut out = Vec::new();
    for m in modif {
        let id = m.get(key);
        match orig.iter().find(|o| o.get(key) == id) {
            None => out.push(m.clone()),
            Some(o) if o == m => {}
            Some(o) => match (o, m) {
                (Value::Object(oo), Value::Object(mo)) => {
                    let mut sub = diff_object(oo, mo, path, meta);
                    sub.insert(key.to_string(), id.cloned().unwrap_or(Value::Null));
                    out.push(Value::Object(sub));
                }
                _ => out.push(m.clone()),
            },
        }
    }
    for o in orig {
        let id = o.get(key);
        if !modif.iter().any(|m| m.get(key) == id) {
            let mut del = Map::new();
            del.insert(PATCH_DIRECTIVE.to_string(), Value::String("delete".to_string()));
            del.insert(key.to_string(), id.cloned().unwrap_or(Value::Null));
            out.push(Value::Object(del));
        }
    }
    Some(out)
}

/// Apply a patch produced by [`create_two_way_patch`] (or a plain JSON
/// merge patch) to `original`.
pub fn apply_patch(original: &Value, patch: &Value, meta: &PatchMeta) -> Result<Value, Error> {
    merge_value(original, patch, "", meta)
}

fn merge_value(orig: &Value, patch: &Value, path: &str, meta: &PatchMeta) -> Result<Value, Error> {
    match (orig, patch) {
        (Value::Object(oo), Value::Object(po)) => {
            Ok(Value::Object(merge_object(oo, po, path, meta)?))
        }
        (Value::Array(oa), Value::Array(pa)) => {
            if let Some(key) = meta.merge_key(path) {
                merge_list(oa, pa, key, path, meta)
            } else {
                Ok(Value::Array(strip_directives(pa)))
            }
        }
        (_, p) => Ok(p.clone()),
    }
}

fn merge_object(orig: &Map<String, Value>, patch: &Map<String, Value>, path: &str, meta: &PatchMeta) -> Result<Map<String, Value>, Error> {
    let mut out = orig.clone();
    for (field, p) in patch {
        let child = join(path, field);
        if p.is_null() {
            out.remove(field);
            continue;
        }
        let merged = match out.get(field) {
            Some(o) => merge_value(o, p, &child, meta)?,
            None => match p {
                Value::Array(pa) => Value::Array(strip_directives(pa)),
                other => other.clone(),
            },
        };
        out.insert(field.clone(), merged);
    }
    Ok(out)
}

fn merge_list(orig: &[Value], patch: &[Value], key: &str, path: &str, meta: &PatchMeta) -> Result<Value, Error> {
    // A patch whose elements carry no merge key is a wholesale replacement,
    // the shape the diff side emits when the live list is not keyable.
    if patch
        .iter()
        .any(|p| p.get(PATCH_DIRECTIVE).is_none() && p.get(key).is_none())
    {
        return Ok(Value::Array(strip_directives(patch)));
    }

    let mut out = orig.to_vec();
    for p in patch {
        if let Some(directive) = p.get(PATCH_DIRECTIVE).and_then(|v| v.as_str()) {
            match directive {
                "delete" => {
                    let id = p.get(key);
                    out.retain(|o| o.get(key) != id);
                }
                "replace" => {
                    return Ok(Value::Array(strip_directives(patch)));
                }
                other => {
                    return Err(Error::PatchConflict {
                        reason: format!("unknown $patch directive {other:?} at {path}"),
                    });
                }
            }
            continue;
        }
        // Scanned above, so the key is present here.
        let id = p.get(key);
        match out.iter().position(|o| o.get(key) == id) {
            Some(i) => out[i] = merge_value(&out[i], p, path, meta)?,
            None => out.push(p.clone()),
        }
    }
    Ok(Value::Array(out))
}

fn strip_directives(list: &[Value]) -> Vec<Value> {
    list.iter()
        .filter(|e| e.get(PATCH_DIRECTIVE).is_none())
        .cloned()
        .collect()
}
