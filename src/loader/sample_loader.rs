use std::path::{Path, PathBuf};

use serde_json::{Value, json};

// every .wav directly inside `dir`, sorted so library order is stable between runs
pub fn index_wav_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

// Append a library entry for each scanned file the document doesn't know yet.
// Ids are the file stems; files are stored relative to `dir`.
pub fn add_to_library(audio: &mut Value, dir: &Path, paths: &[PathBuf]) -> usize {
    if !audio.is_object() {
        *audio = json!({});
    }
    let Some(obj) = audio.as_object_mut() else {
        return 0;
    };
    let library = obj
        .entry("sampleLibrary")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !library.is_array() {
        *library = Value::Array(Vec::new());
    }
    let Some(library) = library.as_array_mut() else {
        return 0;
    };

    let mut added = 0;
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let known = library
            .iter()
            .any(|s| s.get("id").and_then(Value::as_str) == Some(stem));
        if known {
            continue;
        }
        let file = path.strip_prefix(dir).unwrap_or(path);
        library.push(json!({
            "id": stem,
            "name": stem,
            "category": "scanned",
            "file": file.to_string_lossy(),
        }));
        added += 1;
    }
    added
}
