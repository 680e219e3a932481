use std::sync::Arc;

use catalog_core::Action;
use dashmap::DashMap;

// ---------------------------------------------------------------------------
// ActionRegistry
// ---------------------------------------------------------------------------

/// Registry of actions, looked up by name.
///
/// Populated at start-up and read-only while requests are served.
pub struct ActionRegistry {
    by_name: DashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
        }
    }

    /// Register an action under its `name()`. A later registration with the
    /// same name replaces the earlier one.
    pub fn register<A: Action + 'static>(&self, action: A) {
        self.register_arc(Arc::new(action));
    }

    /// Register an already shared action.
    pub fn register_arc(&self, action: Arc<dyn Action>) {
        let name = action.name().to_string();
        if self.by_name.insert(name.clone(), action).is_some() {
            tracing::warn!(action = %name, "action registration replaced an existing action");
        }
    }

    /// Resolve an action by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use catalog_core::{ActionError, CallPayload, InvocationContext};
    use serde_json::{json, Value};

    use super::*;

    /// Test action returning a fixed tag so lookups can be told apart.
    struct TaggedAction {
        action_name: &'static str,
        tag: u32,
    }

    #[async_trait]
    impl Action for TaggedAction {
        fn name(&self) -> &str {
            self.action_name
        }

        async fn invoke(
            &self,
            _ctx: &mut InvocationContext,
            _payload: &CallPayload,
        ) -> Result<Value, ActionError> {
            Ok(json!(self.tag))
        }
    }

    #[test]
    fn register_and_lookup_by_name() {
        let registry = ActionRegistry::new();
        registry.register(TaggedAction { action_name: "package_show", tag: 1 });

        let action = registry.lookup("package_show");
        assert!(action.is_some());
        assert_eq!(action.unwrap().name(), "package_show");
    }

    #[test]
    fn lookup_unregistered_returns_none() {
        let registry = ActionRegistry::new();
        assert!(registry.lookup("nonexistent").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn later_registration_replaces_earlier() {
        let registry = ActionRegistry::new();
        registry.register(TaggedAction { action_name: "package_show", tag: 1 });
        registry.register(TaggedAction { action_name: "package_show", tag: 2 });
        assert_eq!(registry.len(), 1);

        let action = registry.lookup("package_show").unwrap();
        let mut ctx = InvocationContext::new(
            catalog_core::Identity::Anonymous,
            catalog_core::ApiVersion::V3,
        );
        let out = action.invoke(&mut ctx, &CallPayload::new()).await.unwrap();
        assert_eq!(out, json!(2));
    }

    #[test]
    fn names_are_sorted() {
        let registry = ActionRegistry::new();
        registry.register(TaggedAction { action_name: "tag_list", tag: 0 });
        registry.register(TaggedAction { action_name: "group_list", tag: 0 });
        registry.register(TaggedAction { action_name: "package_show", tag: 0 });
        assert_eq!(registry.names(), vec!["group_list", "package_show", "tag_list"]);
    }
}
