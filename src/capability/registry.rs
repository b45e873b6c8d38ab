//! Capability registry: a pure lookup table populated once at startup.

use super::{Capability, CapabilityDescriptor};
use crate::error::{LaerError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Static mapping from capability name to handler.
///
/// Resolution is exact-match on name. Registration order is preserved so the
/// model always sees capabilities listed the same way.
pub struct CapabilityRegistry {
    entries: Vec<Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a capability. Names must be unique and descriptions non-empty,
    /// the description being the only signal the model routes on.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<()> {
        let descriptor = capability.descriptor();

        if descriptor.description.trim().is_empty() {
            return Err(LaerError::Capability(format!(
                "Capability '{}' has an empty description",
                descriptor.name
            )));
        }
        if self.resolve(&descriptor.name).is_some() {
            return Err(LaerError::Capability(format!(
                "Capability '{}' is already registered",
                descriptor.name
            )));
        }

        self.entries.push(capability);
        Ok(())
    }

    /// Resolve a capability by exact name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries
            .iter()
            .find(|c| c.descriptor().name == name)
            .cloned()
    }

    /// Resolve a capability by name, treating excluded names as absent.
    pub fn resolve_active(
        &self,
        name: &str,
        exclusions: &HashSet<String>,
    ) -> Option<Arc<dyn Capability>> {
        if exclusions.contains(name) {
            return None;
        }
        self.resolve(name)
    }

    /// Descriptors of all capabilities not in the exclusion set.
    pub fn list_active(&self, exclusions: &HashSet<String>) -> Vec<CapabilityDescriptor> {
        self.entries
            .iter()
            .map(|c| c.descriptor())
            .filter(|d| !exclusions.contains(&d.name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityKind, InvocationOutcome, TurnContext};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FakeCapability {
        name: &'static str,
        description: &'static str,
    }

    #[async_trait]
    impl Capability for FakeCapability {
        fn descriptor(&self) -> CapabilityDescriptor {
            CapabilityDescriptor {
                name: self.name.to_string(),
                description: self.description.to_string(),
                input_schema: json!({ "type": "object", "properties": {} }),
                kind: CapabilityKind::Direct,
            }
        }

        async fn execute(&self, _args: Value, _ctx: &TurnContext) -> InvocationOutcome {
            InvocationOutcome::success(self.name, "ok")
        }
    }

    fn fake(name: &'static str) -> Arc<dyn Capability> {
        Arc::new(FakeCapability {
            name,
            description: "does something",
        })
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = CapabilityRegistry::new();
        registry.register(fake("explain_topic")).unwrap();

        assert!(registry.resolve("explain_topic").is_some());
        assert!(registry.resolve("explain").is_none(), "no fuzzy matching");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry.register(fake("get_weather")).unwrap();
        assert!(registry.register(fake("get_weather")).is_err());
    }

    #[test]
    fn test_empty_description_rejected() {
        let mut registry = CapabilityRegistry::new();
        let result = registry.register(Arc::new(FakeCapability {
            name: "mystery",
            description: "  ",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_exclusions_filter_listing_and_resolution() {
        let mut registry = CapabilityRegistry::new();
        registry.register(fake("get_weather")).unwrap();
        registry.register(fake("generate_quiz")).unwrap();

        let exclusions: HashSet<String> = ["generate_quiz".to_string()].into_iter().collect();

        let active = registry.list_active(&exclusions);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "get_weather");

        assert!(registry
            .resolve_active("generate_quiz", &exclusions)
            .is_none());
        assert!(registry.resolve_active("get_weather", &exclusions).is_some());
        // the capability is still registered, just inactive for this turn
        assert!(registry.resolve("generate_quiz").is_some());
    }
}
