//! Actions the gateway itself provides.
//!
//! Both hold a weak handle to the registry they are registered in so the
//! registry does not keep itself alive.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use catalog_core::{Action, ActionError, CallPayload, InvocationContext};
use serde_json::{json, Value};

use super::config::GatewayConfig;
use super::registry::ActionRegistry;

/// Registers `help_show` and `status_show`.
pub fn register_builtins(registry: &Arc<ActionRegistry>, config: &Arc<GatewayConfig>) {
    registry.register(HelpShow {
        registry: Arc::downgrade(registry),
    });
    registry.register(StatusShow {
        registry: Arc::downgrade(registry),
        config: Arc::clone(config),
    });
}

fn upgrade(registry: &Weak<ActionRegistry>) -> Result<Arc<ActionRegistry>, ActionError> {
    registry
        .upgrade()
        .ok_or_else(|| ActionError::Internal(anyhow::anyhow!("action registry dropped")))
}

/// Returns the documentation of the action named by `name`.
pub struct HelpShow {
    registry: Weak<ActionRegistry>,
}

#[async_trait]
impl Action for HelpShow {
    fn name(&self) -> &str {
        "help_show"
    }

    fn side_effect_free(&self) -> bool {
        true
    }

    fn help(&self) -> Option<&str> {
        Some("Return the help string for a particular API action.\n\n:param name: action name (e.g. `package_create`)")
    }

    async fn invoke(
        &self,
        _ctx: &mut InvocationContext,
        payload: &CallPayload,
    ) -> Result<Value, ActionError> {
        let Some(name) = payload.get_str("name") else {
            return Err(ActionError::validation([("name", json!(["Missing value"]))]));
        };
        let registry = upgrade(&self.registry)?;
        let action = registry
            .lookup(name)
            .ok_or_else(|| ActionError::not_found_because("Action function not found"))?;
        action
            .help()
            .map(|text| Value::String(text.to_string()))
            .ok_or_else(|| ActionError::not_found_because("Action has no documentation"))
    }
}

/// Reports site and gateway status.
pub struct StatusShow {
    registry: Weak<ActionRegistry>,
    config: Arc<GatewayConfig>,
}

#[async_trait]
impl Action for StatusShow {
    fn name(&self) -> &str {
        "status_show"
    }

    fn side_effect_free(&self) -> bool {
        true
    }

    fn help(&self) -> Option<&str> {
        Some("Return basic information about the site: URL, title, gateway version and API version.")
    }

    async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        _payload: &CallPayload,
    ) -> Result<Value, ActionError> {
        let registry = upgrade(&self.registry)?;
        Ok(json!({
            "site_url": self.config.site_url,
            "site_title": self.config.site_title,
            "gateway_version": env!("CARGO_PKG_VERSION"),
            "api_version": ctx.api_version,
            "action_count": registry.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use catalog_core::{ApiVersion, Identity};

    use super::*;

    fn setup() -> Arc<ActionRegistry> {
        let registry = Arc::new(ActionRegistry::new());
        register_builtins(&registry, &Arc::new(GatewayConfig::default()));
        registry
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new(Identity::Anonymous, ApiVersion::V3)
    }

    #[tokio::test]
    async fn help_show_returns_docs() {
        let registry = setup();
        let help = registry.lookup("help_show").unwrap();
        assert!(help.side_effect_free());

        let mut payload = CallPayload::new();
        payload.insert("name", "status_show");
        let out = help.invoke(&mut ctx(), &payload).await.unwrap();
        assert!(out.as_str().unwrap().starts_with("Return basic information"));
    }

    #[tokio::test]
    async fn help_show_unknown_action_is_not_found() {
        let registry = setup();
        let help = registry.lookup("help_show").unwrap();
        let mut payload = CallPayload::new();
        payload.insert("name", "nope");
        let err = help.invoke(&mut ctx(), &payload).await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn help_show_requires_name() {
        let registry = setup();
        let help = registry.lookup("help_show").unwrap();
        let err = help.invoke(&mut ctx(), &CallPayload::new()).await.unwrap_err();
        assert!(matches!(err, ActionError::Validation { .. }));
    }

    #[tokio::test]
    async fn status_show_reports_config() {
        let registry = setup();
        let status = registry.lookup("status_show").unwrap();
        let out = status.invoke(&mut ctx(), &CallPayload::new()).await.unwrap();
        assert_eq!(out["site_title"], "Data Catalog");
        assert_eq!(out["api_version"], 3);
        assert_eq!(out["action_count"], 2);
    }

    #[tokio::test]
    async fn dropped_registry_is_internal_error() {
        let registry = setup();
        let status = registry.lookup("status_show").unwrap();
        drop(registry);
        let err = status.invoke(&mut ctx(), &CallPayload::new()).await.unwrap_err();
        assert!(matches!(err, ActionError::Internal(_)));
    }
}
