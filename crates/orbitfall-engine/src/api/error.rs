use thiserror::Error;

use crate::api::types::{ModelId, SceneId};

/// Problems with a single scene description document.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Why a scene could not be entered. The previously active scene is untouched
/// whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneLoadError {
    #[error("scene `{0}` is not in the catalog")]
    NotFound(SceneId),

    #[error("scene `{scene}` is malformed: {reason}")]
    Malformed { scene: SceneId, reason: String },

    #[error("scene `{scene}`: required model `{model}` never became ready")]
    AssetTimeout { scene: SceneId, model: ModelId },

    #[error("scene `{0}` requested while another load is in flight")]
    Busy(SceneId),

    #[error("cannot read scene descriptions from {path}: {reason}")]
    Io { path: String, reason: String },
}

impl SceneLoadError {
    pub fn malformed(scene: &SceneId, err: &DefinitionError) -> Self {
        SceneLoadError::Malformed {
            scene: scene.clone(),
            reason: err.to_string(),
        }
    }

    /// The scene the failed load was aimed at, when known.
    pub fn scene(&self) -> Option<&SceneId> {
        match self {
            SceneLoadError::NotFound(scene)
            | SceneLoadError::Busy(scene)
            | SceneLoadError::Malformed { scene, .. }
            | SceneLoadError::AssetTimeout { scene, .. } => Some(scene),
            SceneLoadError::Io { .. } => None,
        }
    }
}
