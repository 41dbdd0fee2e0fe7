use std::path::Path;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;

/// A translation catalog: nested JSON objects whose leaves are strings.
/// Key insertion order is preserved on read and write.
pub type Catalog = Map<String, Value>;

/// Load a catalog document. A missing, unreadable, or malformed file is
/// treated as an empty catalog so a first sync can create it.
pub async fn load(path: &Path) -> Catalog {
    match fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("Catalog {} is not a JSON object, treating as empty", path.display());
                Map::new()
            }
            Err(e) => {
                warn!("Failed to parse catalog {}: {}", path.display(), e);
                Map::new()
            }
        },
        Err(e) => {
            debug!("Failed to read catalog {}: {}", path.display(), e);
            Map::new()
        }
    }
}

/// Persist a catalog with indented, human-diffable formatting. The document
/// is written to a temporary sibling and renamed into place so a concurrent
/// reader never observes a partially-written file.
pub async fn save(path: &Path, catalog: &Catalog) -> Result<()> {
    let mut content = serde_json::to_string_pretty(catalog)?;
    content.push('\n');

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content).await?;
    fs::rename(&tmp_path, path).await?;

    debug!("Saved catalog {}", path.display());
    Ok(())
}

/// Extract the language tag from a catalog filename: two lowercase letters,
/// optionally followed by a hyphen and two uppercase letters, then ".json"
/// (`es.json`, `en-US.json`). Returns `None` for anything else.
pub fn language_tag(filename: &str) -> Option<&str> {
    let stem = filename.strip_suffix(".json")?;
    let valid = match stem.as_bytes() {
        [a, b] => a.is_ascii_lowercase() && b.is_ascii_lowercase(),
        [a, b, b'-', c, d] => {
            a.is_ascii_lowercase()
                && b.is_ascii_lowercase()
                && c.is_ascii_uppercase()
                && d.is_ascii_uppercase()
        }
        _ => false,
    };
    valid.then_some(stem)
}

/// Catalog filename for a language tag.
pub fn catalog_filename(tag: &str) -> String {
    format!("{}.json", tag)
}
