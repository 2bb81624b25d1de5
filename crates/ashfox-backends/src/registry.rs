//! The immutable-after-startup backend registry.

use std::sync::Arc;

use crate::backend::Backend;

/// Holds `{kind → Backend}`, built once at startup and never mutated after.
///
/// `list_kinds()` returns kinds in registration order, not sorted, so the
/// configured default backend is predictable to operators reading `--help`
/// or a `getHealth` dump.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<(String, Arc<dyn Backend>)>,
    default_kind: Option<String>,
}

/// Builds a [`BackendRegistry`]; consumed by [`BackendRegistryBuilder::build`].
#[derive(Default)]
pub struct BackendRegistryBuilder {
    backends: Vec<(String, Arc<dyn Backend>)>,
    default_kind: Option<String>,
}

impl BackendRegistryBuilder {
    /// Register a backend under its own `kind()`.
    ///
    /// # Panics
    ///
    /// Panics if a backend with the same kind is already registered — this
    /// indicates a startup wiring bug, not a runtime condition.
    #[must_use]
    pub fn register(mut self, backend: Arc<dyn Backend>) -> Self {
        let kind = backend.kind().to_string();
        assert!(
            !self.backends.iter().any(|(k, _)| k == &kind),
            "backend kind {kind:?} registered twice"
        );
        self.backends.push((kind, backend));
        self
    }

    /// Set the kind resolved when a caller does not specify one.
    #[must_use]
    pub fn with_default(mut self, kind: impl Into<String>) -> Self {
        self.default_kind = Some(kind.into());
        self
    }

    /// Finalize the registry.
    #[must_use]
    pub fn build(self) -> BackendRegistry {
        BackendRegistry {
            backends: self.backends,
            default_kind: self.default_kind,
        }
    }
}

impl BackendRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> BackendRegistryBuilder {
        BackendRegistryBuilder::default()
    }

    /// Resolve `kind`, or the configured default when `kind` is `None`.
    /// Returns `None` when the resolved kind is unregistered.
    #[must_use]
    pub fn resolve(&self, kind: Option<&str>) -> Option<Arc<dyn Backend>> {
        let kind = kind.or(self.default_kind.as_deref())?;
        self.backends.iter().find(|(k, _)| k == kind).map(|(_, b)| b.clone())
    }

    /// All registered kinds, in registration order.
    #[must_use]
    pub fn list_kinds(&self) -> Vec<String> {
        self.backends.iter().map(|(k, _)| k.clone()).collect()
    }

    /// The configured default kind, if any.
    #[must_use]
    pub fn default_kind(&self) -> Option<&str> {
        self.default_kind.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Availability, BackendHealth, BackendSession};
    use ashfox_core::ToolResult;
    use async_trait::async_trait;
    use serde_json::Value;

    struct StubBackend {
        kind: &'static str,
    }

    #[async_trait]
    impl Backend for StubBackend {
        fn kind(&self) -> &str {
            self.kind
        }

        async fn get_health(&self) -> BackendHealth {
            BackendHealth {
                kind: self.kind.to_string(),
                availability: Availability::Ready,
                version: "0.0.0-test".to_string(),
                details: None,
            }
        }

        async fn handle_tool(
            &self,
            _name: &str,
            payload: Value,
            _session: BackendSession,
        ) -> ToolResult<Value> {
            Ok(payload)
        }
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let registry = BackendRegistry::builder()
            .register(Arc::new(StubBackend { kind: "native" }))
            .register(Arc::new(StubBackend { kind: "blender" }))
            .with_default("native")
            .build();

        assert!(registry.resolve(Some("blender")).is_some());
        assert!(registry.resolve(None).is_some());
        assert!(registry.resolve(Some("unknown")).is_none());
    }

    #[test]
    fn list_kinds_preserves_registration_order() {
        let registry = BackendRegistry::builder()
            .register(Arc::new(StubBackend { kind: "b" }))
            .register(Arc::new(StubBackend { kind: "a" }))
            .build();

        assert_eq!(registry.list_kinds(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn registering_the_same_kind_twice_panics() {
        BackendRegistry::builder()
            .register(Arc::new(StubBackend { kind: "native" }))
            .register(Arc::new(StubBackend { kind: "native" }))
            .build();
    }
}
