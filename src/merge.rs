use serde_json::{Map, Value};

use crate::catalog::Catalog;
use crate::diff::ChangeSet;

/// Merge changed values into a catalog, creating intermediate objects along
/// each dotted path. A non-object value sitting where nesting is needed is
/// replaced with an empty object, losing the colliding scalar. Keys not
/// named by the change set are left untouched.
///
/// Paths in a change set are independent, so the result does not depend on
/// application order.
pub fn apply(target: &mut Catalog, changes: &ChangeSet) {
    for (path, value) in changes {
        set_leaf(target, path, value);
    }
}

fn set_leaf(target: &mut Catalog, path: &str, value: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut node = target;
    for segment in parents {
        let entry = node
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Some(map) = entry.as_object_mut() else {
            return;
        };
        node = map;
    }
    node.insert((*leaf).to_string(), Value::String(value.to_string()));
}
