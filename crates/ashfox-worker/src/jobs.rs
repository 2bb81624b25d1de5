//! Per-job-kind execution against a resolved backend.

use ashfox_backends::{Backend, BackendSession};
use ashfox_core::error::{ErrorCode, ToolError};
use ashfox_core::jobs::JobKind;
use ashfox_core::ToolResult;
use serde_json::{json, Value};

/// The backend tool names each job kind drives, used for the pre-flight
/// capabilities check.
#[must_use]
pub fn required_tools(kind: JobKind) -> &'static [&'static str] {
    match kind {
        JobKind::GltfConvert => &["ensure_project", "export", "get_project_state"],
        JobKind::TexturePreflight => &["ensure_project", "preflight_texture"],
    }
}

/// Verify every tool `required_tools(kind)` names is reported `available` by
/// a `list_capabilities` backend response shaped as `{"tools": [...]}`, where
/// entries are either bare tool-name strings or `{name, available}` objects.
pub fn check_capabilities(kind: JobKind, capabilities: &Value) -> Result<(), ToolError> {
    let entries = capabilities.get("tools").and_then(Value::as_array);
    let mut missing = Vec::new();

    for tool in required_tools(kind) {
        let available = entries.is_some_and(|entries| {
            entries.iter().any(|entry| match entry {
                Value::String(name) => name == tool,
                Value::Object(_) => {
                    entry.get("name").and_then(Value::as_str) == Some(*tool)
                        && entry
                            .get("available")
                            .and_then(Value::as_bool)
                            .unwrap_or(true)
                }
                _ => false,
            })
        });
        if !available {
            missing.push(*tool);
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::new(
            ErrorCode::NotImplemented,
            format!("backend is missing required capabilities: {}", missing.join(", ")),
        ))
    }
}

/// Execute `kind` against `backend` under `session`, returning the composed
/// `NativeJobResult`-shaped value the worker stores as the job's `result`.
pub async fn execute(
    kind: JobKind,
    backend: &dyn Backend,
    session: BackendSession,
    payload: Value,
) -> ToolResult<Value> {
    match kind {
        JobKind::GltfConvert => execute_gltf_convert(backend, session, payload).await,
        JobKind::TexturePreflight => execute_texture_preflight(backend, session, payload).await,
    }
}

async fn execute_gltf_convert(
    backend: &dyn Backend,
    session: BackendSession,
    payload: Value,
) -> ToolResult<Value> {
    backend
        .handle_tool("ensure_project", json!({}), session.clone())
        .await?;

    let codec_id = payload.get("codecId").and_then(Value::as_str);
    let export_payload = match codec_id {
        Some(codec_id) => json!({"format": "native_codec", "codecId": codec_id}),
        None => json!({"format": "gltf"}),
    };
    let export_result = backend
        .handle_tool("export", export_payload, session.clone())
        .await?;

    let state = backend
        .handle_tool("get_project_state", json!({}), session)
        .await?;

    let selected_target = export_result
        .get("selectedTarget")
        .cloned()
        .unwrap_or_else(|| json!(codec_id.unwrap_or("gltf")));
    let selected_format = export_result
        .get("selectedFormat")
        .cloned()
        .unwrap_or_else(|| json!(codec_id.unwrap_or("gltf")));
    let export_path = export_result.get("exportPath").cloned().unwrap_or(Value::Null);

    Ok(json!({
        "kind": JobKind::GltfConvert.as_str(),
        "status": "converted",
        "output": {
            "exportPath": export_path,
            "selectedTarget": selected_target,
            "requestedCodecId": codec_id,
            "selectedFormat": selected_format,
        },
        "hasGeometry": state.get("hasGeometry").cloned().unwrap_or(json!(false)),
        "hierarchy": state.get("hierarchy").cloned().unwrap_or(json!([])),
        "animations": state.get("animations").cloned().unwrap_or(json!([])),
        "textures": state.get("textures").cloned().unwrap_or(json!([])),
        "textureSources": state.get("textureSources").cloned().unwrap_or(json!([])),
    }))
}

async fn execute_texture_preflight(
    backend: &dyn Backend,
    session: BackendSession,
    payload: Value,
) -> ToolResult<Value> {
    backend
        .handle_tool("ensure_project", json!({}), session.clone())
        .await?;

    let texture_ids: Vec<String> = payload
        .get("textureIds")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let preflight_payload = json!({
        "textureIds": texture_ids,
        "maxDimension": payload.get("maxDimension").cloned().unwrap_or(Value::Null),
        "allowNonPowerOfTwo": payload.get("allowNonPowerOfTwo").cloned().unwrap_or(json!(false)),
    });
    let report = backend
        .handle_tool("preflight_texture", preflight_payload, session)
        .await?;

    let resolved: Vec<&str> = report
        .get("resolved")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let oversized = report.get("oversized").and_then(Value::as_u64).unwrap_or(0);
    let non_power_of_two = report
        .get("nonPowerOfTwo")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut diagnostics: Vec<String> = report
        .get("diagnostics")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let missing: Vec<&str> = texture_ids
        .iter()
        .map(String::as_str)
        .filter(|id| !resolved.contains(id))
        .collect();
    if !missing.is_empty() {
        diagnostics.push(format!("missing texture id(s): {}", missing.join(", ")));
    }

    let unresolved_count = missing.len() as u64;
    let checked = resolved.len() as u64;
    let passed = oversized == 0 && non_power_of_two == 0 && unresolved_count == 0;

    if passed {
        Ok(json!({
            "kind": JobKind::TexturePreflight.as_str(),
            "status": "passed",
            "summary": {
                "checked": checked,
                "oversized": oversized,
                "nonPowerOfTwo": non_power_of_two,
                "unresolvedCount": unresolved_count,
            },
            "diagnostics": diagnostics,
        }))
    } else {
        Ok(json!({
            "kind": JobKind::TexturePreflight.as_str(),
            "status": "failed",
            "summary": {
                "checked": checked,
                "oversized": oversized,
                "nonPowerOfTwo": non_power_of_two,
                "unresolvedCount": unresolved_count,
            },
            "diagnostics": diagnostics,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashfox_backends::BackendHealth;
    use async_trait::async_trait;
    use serde_json::json;

    struct StubBackend;

    #[async_trait]
    impl Backend for StubBackend {
        fn kind(&self) -> &str {
            "stub"
        }

        async fn get_health(&self) -> BackendHealth {
            unreachable!("not exercised by these tests")
        }

        async fn handle_tool(
            &self,
            name: &str,
            _payload: Value,
            _session: BackendSession,
        ) -> ToolResult<Value> {
            match name {
                "ensure_project" => Ok(json!({})),
                "preflight_texture" => Ok(json!({
                    "resolved": [],
                    "oversized": 0,
                    "nonPowerOfTwo": 0,
                    "diagnostics": [],
                })),
                other => panic!("unexpected tool call: {other}"),
            }
        }
    }

    fn session() -> BackendSession {
        BackendSession {
            tenant_id: "tenant-1".into(),
            actor_id: "actor-1".into(),
            project_id: "project-1".into(),
        }
    }

    #[tokio::test]
    async fn missing_texture_reports_zero_checked() {
        let result = execute_texture_preflight(
            &StubBackend,
            session(),
            json!({"textureIds": ["missing-texture"]}),
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "failed");
        assert_eq!(result["summary"]["checked"], 0);
        assert_eq!(result["summary"]["unresolvedCount"], 1);
    }

    #[test]
    fn required_tools_match_job_kind() {
        assert_eq!(
            required_tools(JobKind::GltfConvert),
            &["ensure_project", "export", "get_project_state"]
        );
        assert_eq!(
            required_tools(JobKind::TexturePreflight),
            &["ensure_project", "preflight_texture"]
        );
    }

    #[test]
    fn missing_capability_is_reported_by_name() {
        let capabilities = json!({"tools": ["ensure_project", "get_project_state"]});
        let err = check_capabilities(JobKind::GltfConvert, &capabilities).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotImplemented);
        assert!(err.message.contains("export"));
    }

    #[test]
    fn object_shaped_capability_entries_are_honored() {
        let capabilities = json!({"tools": [
            {"name": "ensure_project", "available": true},
            {"name": "export", "available": false},
            {"name": "get_project_state", "available": true},
        ]});
        let err = check_capabilities(JobKind::GltfConvert, &capabilities).unwrap_err();
        assert!(err.message.contains("export"));
    }

    #[test]
    fn fully_available_capabilities_pass() {
        let capabilities = json!({"tools": ["ensure_project", "export", "get_project_state"]});
        assert!(check_capabilities(JobKind::GltfConvert, &capabilities).is_ok());
    }
}
