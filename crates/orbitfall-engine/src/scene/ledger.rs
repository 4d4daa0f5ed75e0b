use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::api::types::SceneId;

/// Ledger key for a body: `"<scene>/<body name>"`.
pub fn stable_id(scene: &SceneId, body: &str) -> String {
    format!("{}/{}", scene, body)
}

/// Persisted record of mined objects, re-read on scene entry so a mined body
/// stays gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedLedger {
    #[serde(default)]
    mined: BTreeSet<String>,
}

impl MinedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Returns false if the id was already recorded.
    pub fn record(&mut self, stable_id: impl Into<String>) -> bool {
        self.mined.insert(stable_id.into())
    }

    pub fn contains(&self, stable_id: &str) -> bool {
        self.mined.contains(stable_id)
    }

    pub fn is_mined(&self, scene: &SceneId, body: &str) -> bool {
        self.contains(&stable_id(scene, body))
    }

    /// Forget everything mined in one scene. Returns how many entries went.
    pub fn forget_scene(&mut self, scene: &SceneId) -> usize {
        let prefix = format!("{}/", scene);
        let before = self.mined.len();
        self.mined.retain(|id| !id.starts_with(&prefix));
        before - self.mined.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.mined.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mined.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_keyed_by_scene_and_body() {
        let mut ledger = MinedLedger::new();
        let belt = SceneId::new("belt");
        assert!(ledger.record(stable_id(&belt, "rock_3")));
        assert!(!ledger.record(stable_id(&belt, "rock_3")));
        assert!(ledger.is_mined(&belt, "rock_3"));
        assert!(!ledger.is_mined(&SceneId::new("moon"), "rock_3"));
    }

    #[test]
    fn survives_persistence() {
        let mut ledger = MinedLedger::new();
        ledger.record("belt/rock_1");
        ledger.record("belt/rock_2");
        let json = ledger.to_json().unwrap();
        assert_eq!(MinedLedger::from_json(&json).unwrap(), ledger);
        assert!(MinedLedger::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn forget_scene_only_touches_that_scene() {
        let mut ledger = MinedLedger::new();
        ledger.record("belt/rock_1");
        ledger.record("belt_outer/rock_1");
        assert_eq!(ledger.forget_scene(&SceneId::new("belt")), 1);
        assert!(ledger.contains("belt_outer/rock_1"));
    }
}
