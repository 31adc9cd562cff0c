// loads the config document from disk and merges partial edits into it.
// the document is the whole app config; the sequencer only cares about its `audio` part.
use std::path::Path;

use serde_json::{Value, json};
use tracing::warn;

pub fn default_document() -> Value {
    json!({
        "groupName": "Trackerbox",
        "audio": {
            "bpm": 120,
            "swing": 0,
            "stepsPerBar": 8,
            "loop": true,
            "sampleLibrary": [],
            "tracks": []
        }
    })
}

pub fn load_document(path: &Path) -> anyhow::Result<Value> {
    let data = std::fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&data)?;
    Ok(doc)
}

// never fails; a broken file just means we start from the defaults
pub fn load_document_or_default(path: &Path) -> Value {
    match load_document(path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            default_document()
        }
    }
}

pub fn save_document(path: &Path, doc: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, json)?;
    Ok(())
}

// the audio section of a document; a bare audio config is accepted as-is
pub fn audio_section(doc: &Value) -> &Value {
    match doc.get("audio") {
        Some(audio) if audio.is_object() => audio,
        _ => doc,
    }
}

// objects merge key by key, everything else (arrays included) replaces
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_object() {
                    let slot = target
                        .entry(key.clone())
                        .or_insert_with(|| Value::Object(Default::default()));
                    if !slot.is_object() {
                        *slot = Value::Object(Default::default());
                    }
                    deep_merge(slot, value);
                } else {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
