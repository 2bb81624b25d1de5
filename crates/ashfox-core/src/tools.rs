//! The authoritative tool-name registry and mutating/non-mutating classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the fixed tool catalog.
#[derive(Debug, Clone, Copy)]
pub struct ToolMeta {
    /// Wire name, e.g. `"add_bone"`.
    pub name: &'static str,
    /// Whether the dispatcher treats this tool as a mutating call: it requires
    /// a write-authorized project lock and may bump the project revision.
    pub mutating: bool,
    /// Whether the tool operates against a resolved project (most do).
    pub requires_project: bool,
}

macro_rules! tool_table {
    ($(($name:literal, $mutating:literal, $requires_project:literal)),+ $(,)?) => {
        /// The fixed tool catalog, in the order tests enumerate it.
        pub const TOOL_REGISTRY: &[ToolMeta] = &[
            $(ToolMeta { name: $name, mutating: $mutating, requires_project: $requires_project }),+
        ];
    };
}

// Mutating = name starts with one of the ensure_/add_/update_/delete_/set_/
// assign_/paint_/create_/export families (exact "export" included).
tool_table![
    ("list_capabilities", false, false),
    ("get_project_state", false, true),
    ("read_texture", false, true),
    ("export_trace_log", true, true),
    ("reload_plugins", false, false),
    ("generate_texture_preset", false, true),
    ("auto_uv_atlas", false, true),
    ("set_project_texture_resolution", true, true),
    ("preflight_texture", false, true),
    ("ensure_project", true, true),
    ("delete_texture", true, true),
    ("assign_texture", true, true),
    ("set_face_uv", true, true),
    ("add_bone", true, true),
    ("update_bone", true, true),
    ("delete_bone", true, true),
    ("add_cube", true, true),
    ("update_cube", true, true),
    ("delete_cube", true, true),
    ("create_animation_clip", true, true),
    ("update_animation_clip", true, true),
    ("delete_animation_clip", true, true),
    ("set_keyframes", true, true),
    ("set_trigger_keyframes", true, true),
    ("set_frame_pose", true, true),
    ("paint_faces", true, true),
    ("paint_mesh_face", true, true),
    ("export", true, true),
    ("render_preview", false, true),
    ("validate", false, true),
];

/// A validated tool name: one of [`TOOL_REGISTRY`]'s entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolName(String);

impl ToolName {
    /// Validate and wrap a wire tool name.
    ///
    /// # Errors
    ///
    /// Returns the original string if it is not in [`TOOL_REGISTRY`].
    pub fn parse(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if TOOL_REGISTRY.iter().any(|t| t.name == name) {
            Ok(Self(name))
        } else {
            Err(name)
        }
    }

    /// Look up this tool's metadata. Always present for a validated `ToolName`.
    #[must_use]
    pub fn meta(&self) -> ToolMeta {
        TOOL_REGISTRY
            .iter()
            .copied()
            .find(|t| t.name == self.0)
            .expect("ToolName is only constructed from TOOL_REGISTRY entries")
    }

    /// Whether this tool mutates project state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        self.meta().mutating
    }

    /// Whether this tool requires a resolved project.
    #[must_use]
    pub fn requires_project(&self) -> bool {
        self.meta().requires_project
    }

    /// Borrow the wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
