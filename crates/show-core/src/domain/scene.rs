//! Scene entity.
//!
//! A [`Scene`] identifies a named configuration of media the controller can
//! present.  The client asks for the list of scenes once per session, picks
//! one, and refers to it only by [`SceneId`] afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque, stable scene identifier assigned by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Wraps a controller-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A controller-defined configuration of media to present.
///
/// Only `id` carries protocol meaning.  Everything else the controller sends
/// (`name`, `displayDuration`, `maximumOnScreen`, the scene's media list…) is
/// kept verbatim in [`Scene::metadata`] so it can be logged, but the client
/// never interprets it.
///
/// ```rust
/// use show_core::Scene;
///
/// let scene: Scene = serde_json::from_str(r#"{"_id":"A","name":"Lobby"}"#).unwrap();
/// assert_eq!(scene.id.as_str(), "A");
/// assert_eq!(scene.name.as_deref(), Some("Lobby"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// The scene's identifier, written as `_id` and also accepted as `id`.
    #[serde(rename = "_id", alias = "id")]
    pub id: SceneId,

    /// Human-readable scene name, when the controller provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// All other fields, preserved untouched.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Scene {
    /// Creates a scene that carries only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: SceneId::new(id),
            name: None,
            metadata: Map::new(),
        }
    }

    /// Returns a short label for log lines: the name when known, else the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_decodes_underscore_id_key() {
        // Arrange
        let json = r#"{"_id":"5a1f","name":"Foyer"}"#;

        // Act
        let scene: Scene = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(scene.id, SceneId::new("5a1f"));
        assert_eq!(scene.name.as_deref(), Some("Foyer"));
        assert!(scene.metadata.is_empty());
    }

    #[test]
    fn test_scene_accepts_plain_id_key() {
        let scene: Scene = serde_json::from_str(r#"{"id":"A"}"#).unwrap();
        assert_eq!(scene.id.as_str(), "A");
    }

    #[test]
    fn test_scene_without_id_is_rejected() {
        let result: Result<Scene, _> = serde_json::from_str(r#"{"name":"nameless"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_scene_preserves_unknown_fields_as_metadata() {
        // Arrange: a scene as the controller stores it, with display settings
        let json = r#"{"_id":"A","displayDuration":10,"maximumOnScreen":{"video":1}}"#;

        // Act
        let scene: Scene = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(scene.metadata.get("displayDuration"), Some(&Value::from(10)));
        assert!(scene.metadata.contains_key("maximumOnScreen"));
        assert!(!scene.metadata.contains_key("_id"));
    }

    #[test]
    fn test_scene_serializes_id_as_underscore_id() {
        let json = serde_json::to_string(&Scene::new("B")).unwrap();
        assert_eq!(json, r#"{"_id":"B"}"#);
    }

    #[test]
    fn test_scene_id_serializes_as_bare_string() {
        // `loadScene` and `playScene` carry the id itself, not an object.
        let value = serde_json::to_value(SceneId::new("A")).unwrap();
        assert_eq!(value, Value::String("A".to_string()));
    }

    #[test]
    fn test_label_prefers_name() {
        let mut scene = Scene::new("A");
        assert_eq!(scene.label(), "A");
        scene.name = Some("Main stage".to_string());
        assert_eq!(scene.label(), "Main stage");
    }
}
