//! Snapshot visitors turning a registry walk into plain data.

use super::registry::Registry;
use super::visitor::{Mode, Visitor};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Collects a nested JSON object mirroring the registry tree.
#[must_use]
pub fn collect_structured(registry: &Registry, mode: Mode) -> Value {
    let mut visitor = StructuredVisitor::default();
    registry.visit(mode, &mut visitor);
    visitor
        .root
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Collects every integer under its dotted path.
///
/// Registries without values leave no trace in the result.
#[must_use]
pub fn collect_flat(registry: &Registry, mode: Mode) -> BTreeMap<String, i64> {
    let mut visitor = FlatVisitor::default();
    registry.visit(mode, &mut visitor);
    visitor.values
}

#[derive(Default)]
struct StructuredVisitor {
    stack: Vec<(Option<String>, Map<String, Value>)>,
    pending: Option<String>,
    root: Option<Value>,
}

impl Visitor for StructuredVisitor {
    fn on_registry_start(&mut self) {
        let key = self.pending.take();
        self.stack.push((key, Map::new()));
    }

    fn on_registry_finished(&mut self) {
        let Some((key, map)) = self.stack.pop() else {
            return;
        };
        match (key, self.stack.last_mut()) {
            (Some(key), Some((_, parent))) => match parent.get_mut(&key) {
                // Two report functions may open the same namespace.
                Some(Value::Object(existing)) => existing.extend(map),
                _ => {
                    parent.insert(key, Value::Object(map));
                }
            },
            // A keyless section inside another one adds to its parent.
            (None, Some((_, parent))) => parent.extend(map),
            (_, None) => self.root = Some(Value::Object(map)),
        }
    }

    fn on_key(&mut self, key: &str) {
        self.pending = Some(key.to_string());
    }

    fn on_int(&mut self, value: i64) {
        if let (Some(key), Some((_, top))) = (self.pending.take(), self.stack.last_mut()) {
            top.insert(key, Value::from(value));
        }
    }
}

#[derive(Default)]
struct FlatVisitor {
    path: Vec<Option<String>>,
    pending: Option<String>,
    values: BTreeMap<String, i64>,
}

impl Visitor for FlatVisitor {
    fn on_registry_start(&mut self) {
        self.path.push(self.pending.take());
    }

    fn on_registry_finished(&mut self) {
        self.path.pop();
    }

    fn on_key(&mut self, key: &str) {
        self.pending = Some(key.to_string());
    }

    fn on_int(&mut self, value: i64) {
        let Some(key) = self.pending.take() else {
            return;
        };
        let mut full: Vec<&str> = self.path.iter().flatten().map(String::as_str).collect();
        full.push(&key);
        self.values.insert(full.join("."), value);
    }
}
