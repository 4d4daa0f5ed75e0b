use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::api::error::SceneLoadError;
use crate::api::types::SceneId;
use crate::assets::definition::SceneDefinition;

/// Registry of scene descriptions keyed by scene id.
///
/// Sources are kept as raw text and parsed on demand, so a corrupt file only
/// fails the transition that needs it.
#[derive(Debug, Default, Clone)]
pub struct SceneCatalog {
    sources: HashMap<SceneId, String>,
}

impl SceneCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the description text for `id`, replacing any previous one.
    pub fn insert_source(&mut self, id: impl Into<SceneId>, json: impl Into<String>) {
        let id = id.into();
        if self.sources.insert(id.clone(), json.into()).is_some() {
            log::debug!("scene description `{id}` replaced");
        }
    }

    /// Register a source whose id is read from the document itself.
    /// Returns the id, or `None` if the document has no usable id.
    pub fn insert_document(&mut self, json: &str) -> Option<SceneId> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        let id = value.get("id")?.as_str()?.trim();
        if id.is_empty() {
            return None;
        }
        let id = SceneId::new(id);
        self.insert_source(id.clone(), json);
        Some(id)
    }

    /// Register every `*.json` file in `dir`, keyed by file stem.
    /// Returns how many files were registered.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, SceneLoadError> {
        let dir = dir.as_ref();
        let io_err = |err: std::io::Error| SceneLoadError::Io {
            path: dir.display().to_string(),
            reason: err.to_string(),
        };
        let mut count = 0;
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(text) => {
                    self.insert_source(SceneId::new(stem), text);
                    count += 1;
                }
                Err(err) => log::warn!("skipping {}: {err}", path.display()),
            }
        }
        log::info!("catalog: {count} scene descriptions from {}", dir.display());
        Ok(count)
    }

    pub fn contains(&self, id: &SceneId) -> bool {
        self.sources.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Parse the description for `id`.
    pub fn resolve(&self, id: &SceneId) -> Result<SceneDefinition, SceneLoadError> {
        let source = self
            .sources
            .get(id)
            .ok_or_else(|| SceneLoadError::NotFound(id.clone()))?;
        let definition =
            SceneDefinition::from_json(source).map_err(|err| SceneLoadError::malformed(id, &err))?;
        if &definition.id != id {
            return Err(SceneLoadError::Malformed {
                scene: id.clone(),
                reason: format!("document declares id `{}`", definition.id),
            });
        }
        Ok(definition)
    }
}
