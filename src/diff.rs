use std::collections::BTreeMap;
use serde_json::Value;

use crate::catalog::Catalog;

/// Changed leaf values since a reference state, addressed by dotted path.
pub type ChangeSet = BTreeMap<String, String>;

/// Compute the string leaves that are new or different in `new` relative to
/// `old`. Keys present only in `old` produce no entries: deletions are not
/// synchronized.
pub fn diff(old: &Catalog, new: &Catalog) -> ChangeSet {
    let mut changes = ChangeSet::new();
    diff_node(old, new, None, &mut changes);
    changes
}

fn diff_node(old: &Catalog, new: &Catalog, prefix: Option<&str>, changes: &mut ChangeSet) {
    for (key, value) in new {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };

        match value {
            Value::String(text) => {
                let unchanged =
                    matches!(old.get(key), Some(Value::String(existing)) if existing == text);
                if !unchanged {
                    changes.insert(path, text.clone());
                }
            }
            Value::Object(sub) => {
                // An old subtree that is missing or not an object compares as
                // empty: everything under it is reported as new.
                let empty = Catalog::new();
                let old_sub = match old.get(key) {
                    Some(Value::Object(map)) => map,
                    _ => &empty,
                };
                diff_node(old_sub, sub, Some(&path), changes);
            }
            // Leaves are strings per the catalog model; other values are
            // not translation units and are left alone.
            _ => {}
        }
    }
}
