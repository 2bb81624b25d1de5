//! Native pipeline job kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of asynchronous native job a client can submit to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Convert a project's geometry/animation graph to an export format.
    #[serde(rename = "gltf.convert")]
    GltfConvert,
    /// Validate a project's textures against size/power-of-two constraints.
    #[serde(rename = "texture.preflight")]
    TexturePreflight,
}

impl JobKind {
    /// Wire identifier, e.g. `"gltf.convert"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GltfConvert => "gltf.convert",
            Self::TexturePreflight => "texture.preflight",
        }
    }

    /// Parse a wire identifier, returning `None` for unknown kinds.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gltf.convert" => Some(Self::GltfConvert),
            "texture.preflight" => Some(Self::TexturePreflight),
            _ => None,
        }
    }

    /// Whether submitting this kind for a missing project implicitly creates it.
    #[must_use]
    pub fn allows_implicit_project_creation(&self) -> bool {
        matches!(self, Self::GltfConvert)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_wire_strings() {
        assert_eq!(JobKind::parse("gltf.convert"), Some(JobKind::GltfConvert));
        assert_eq!(
            JobKind::parse("texture.preflight"),
            Some(JobKind::TexturePreflight)
        );
        assert_eq!(JobKind::parse("unknown.kind"), None);
        assert_eq!(JobKind::GltfConvert.to_string(), "gltf.convert");
    }
}
