//! Dispatch: resolve the action, extract its payload, invoke it, and build
//! the response envelope.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use catalog_core::{
    Action, ActionError, ApiVersion, CallPayload, Identity, InvocationContext, ResponseEnvelope,
};
use serde_json::Value;
use tracing::{info, info_span, Instrument};

use super::extract::{extract, InputError};
use super::framer::ResponseFramer;
use super::request::{CallRequest, TransportMethod};
use super::taxonomy;
use crate::service::{ActionRegistry, GatewayConfig};

/// Field stripped from payloads of JSONP calls.
const CALLBACK_FIELD: &str = "callback";

/// Ties payload extraction, action invocation, error taxonomy and response
/// framing together. One instance serves all calls; it holds no per-call state.
pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    config: Arc<GatewayConfig>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<ActionRegistry>, config: Arc<GatewayConfig>) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &Arc<GatewayConfig> {
        &self.config
    }

    /// Handles one HTTP action call end to end.
    pub async fn dispatch(
        &self,
        name: &str,
        version: ApiVersion,
        identity: Identity,
        request: Request<Body>,
    ) -> Response {
        let framer = ResponseFramer::for_query(
            TransportMethod::from_http(request.method()),
            request.uri().query(),
        );

        let span = info_span!(
            "action",
            action = name,
            api_version = version.get(),
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let (status, envelope) = async move {
            let start = Instant::now();
            let (status, envelope) = match self.registry.lookup(name) {
                None => unknown_action(name),
                Some(action) => {
                    let help = self.config.help_url(version, name);
                    match CallRequest::from_http(request).await {
                        Ok(call) => self.run(&*action, version, identity, &call, help).await,
                        Err(err) => input_failure(help, &err),
                    }
                }
            };
            record_outcome(start, status);
            (status, envelope)
        }
        .instrument(span)
        .await;

        framer.envelope(status, &envelope)
    }

    /// Runs a call that has already been read, returning the status and envelope.
    pub async fn call(
        &self,
        name: &str,
        version: ApiVersion,
        identity: Identity,
        request: &CallRequest,
    ) -> (StatusCode, ResponseEnvelope) {
        let Some(action) = self.registry.lookup(name) else {
            return unknown_action(name);
        };
        let help = self.config.help_url(version, name);
        self.run(&*action, version, identity, request, help).await
    }

    /// Invokes an action with a payload built by the caller (utility routes).
    ///
    /// # Errors
    ///
    /// Returns `None` inside `Err` when the action is not registered, or the
    /// action's own error.
    pub async fn invoke_direct(
        &self,
        name: &str,
        version: ApiVersion,
        identity: Identity,
        payload: &CallPayload,
    ) -> Result<Value, Option<ActionError>> {
        let action = self.registry.lookup(name).ok_or(None)?;
        let mut ctx = InvocationContext::new(identity, version);
        action.invoke(&mut ctx, payload).await.map_err(Some)
    }

    async fn run(
        &self,
        action: &dyn Action,
        version: ApiVersion,
        identity: Identity,
        request: &CallRequest,
        help: String,
    ) -> (StatusCode, ResponseEnvelope) {
        let mut ctx = InvocationContext::new(identity, version);

        let mut payload = match extract(request, action.side_effect_free()) {
            Ok(payload) => payload,
            Err(err) => return input_failure(help, &err),
        };

        // JSONP calls cannot carry credentials of their own; they only ever
        // run as an anonymous caller.
        if payload.remove(CALLBACK_FIELD).is_some() {
            ctx.force_anonymous();
        }

        match action.invoke(&mut ctx, &payload).await {
            Ok(result) => {
                let mut envelope = ResponseEnvelope::success(Some(help), result);
                if !ctx.changed_entities.is_empty() {
                    envelope = envelope.with_changed_entities(ctx.changed_entities.to_sorted_lists());
                }
                (StatusCode::OK, envelope)
            }
            Err(err) => {
                let (status, record) = taxonomy::classify(&err, &payload);
                (status, ResponseEnvelope::failure(Some(help), record))
            }
        }
    }
}

fn unknown_action(name: &str) -> (StatusCode, ResponseEnvelope) {
    info!(action = %name, "action name not known");
    (
        StatusCode::BAD_REQUEST,
        ResponseEnvelope::failure(None, taxonomy::unknown_action(name)),
    )
}

fn input_failure(help: String, err: &InputError) -> (StatusCode, ResponseEnvelope) {
    info!(error = %err, "bad action API request data");
    let status = match err {
        InputError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        ResponseEnvelope::failure(Some(help), taxonomy::input_error(err)),
    )
}

fn record_outcome(start: Instant, status: StatusCode) {
    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = start.elapsed().as_millis() as u64;
    let outcome = if status.is_success() { "ok" } else { "error" };
    let span = tracing::Span::current();
    span.record("duration_ms", duration_ms);
    span.record("outcome", outcome);
    info!(duration_ms, outcome, status = status.as_u16(), "action complete");
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::{header, Method};
    use catalog_core::Principal;
    use serde_json::json;

    use super::*;
    use crate::dispatch::request::MultiValueParams;

    /// Echoes its payload and the caller it ran as.
    struct Whoami {
        side_effect_free: bool,
    }

    #[async_trait]
    impl Action for Whoami {
        fn name(&self) -> &str {
            if self.side_effect_free {
                "whoami"
            } else {
                "whoami_write"
            }
        }

        fn side_effect_free(&self) -> bool {
            self.side_effect_free
        }

        async fn invoke(
            &self,
            ctx: &mut InvocationContext,
            payload: &CallPayload,
        ) -> Result<Value, ActionError> {
            Ok(json!({
                "user": ctx.identity.user_name(),
                "api_version": ctx.api_version,
                "payload": payload.to_json(),
            }))
        }
    }

    /// Records changes out of order.
    struct Touch;

    #[async_trait]
    impl Action for Touch {
        fn name(&self) -> &str {
            "package_patch"
        }

        async fn invoke(
            &self,
            ctx: &mut InvocationContext,
            _payload: &CallPayload,
        ) -> Result<Value, ActionError> {
            for id in ["c", "a", "b"] {
                ctx.record_change("package", id);
            }
            ctx.record_change("group", "g");
            Ok(json!(true))
        }
    }

    /// Fails with whatever error the payload's `fail` field names.
    struct Failing;

    #[async_trait]
    impl Action for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn invoke(
            &self,
            _ctx: &mut InvocationContext,
            payload: &CallPayload,
        ) -> Result<Value, ActionError> {
            Err(match payload.get_str("fail").unwrap_or_default() {
                "auth" => ActionError::not_authorized_because("no rights"),
                "missing" => ActionError::not_found(),
                "integrity" => ActionError::integrity("malformed object"),
                _ => ActionError::Internal(anyhow::anyhow!("secret stack detail")),
            })
        }
    }

    fn dispatcher() -> Dispatcher {
        let registry = Arc::new(ActionRegistry::new());
        registry.register(Whoami { side_effect_free: true });
        registry.register(Whoami { side_effect_free: false });
        registry.register(Touch);
        registry.register(Failing);
        Dispatcher::new(registry, Arc::new(GatewayConfig::default()))
    }

    fn alice() -> Identity {
        Identity::Authenticated(Principal::new("alice"))
    }

    fn json_post(body: &str) -> CallRequest {
        CallRequest::new(TransportMethod::Post).with_body("application/json", body.to_string())
    }

    #[tokio::test]
    async fn unknown_action_is_400_without_help() {
        let (status, env) = dispatcher()
            .call("nope", ApiVersion::V3, Identity::Anonymous, &json_post("{}"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            env.to_json(),
            json!({
                "success": false,
                "error": {"__type": "Validation Error", "message": "Action name not known: nope"},
            })
        );
    }

    #[tokio::test]
    async fn success_envelope_carries_help_and_result() {
        let (status, env) = dispatcher()
            .call("whoami_write", ApiVersion::V3, alice(), &json_post(r#"{"id": "x"}"#))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            env.help.as_deref(),
            Some("http://localhost:5000/api/3/action/help_show?name=whoami_write")
        );
        assert!(env.success);
        let result = env.result.unwrap();
        assert_eq!(result["user"], "alice");
        assert_eq!(result["payload"], json!({"id": "x"}));
        assert!(env.changed_entities.is_none());
    }

    #[tokio::test]
    async fn get_on_write_action_is_input_error_with_help() {
        let req = CallRequest::new(TransportMethod::Get).with_query("id=x");
        let (status, env) = dispatcher()
            .call("whoami_write", ApiVersion::V3, alice(), &req)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(env.help.is_some());
        let error = env.error.unwrap();
        assert!(error.message.unwrap().starts_with("Input Error: "));
    }

    #[tokio::test]
    async fn get_on_read_action_uses_query() {
        let req = CallRequest::new(TransportMethod::Get).with_query("id=x&id=y");
        let (status, env) = dispatcher().call("whoami", ApiVersion::V3, alice(), &req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(env.result.unwrap()["payload"], json!({"id": ["x", "y"]}));
    }

    #[tokio::test]
    async fn callback_field_is_stripped_and_caller_made_anonymous() {
        let req = CallRequest::new(TransportMethod::Get).with_query("id=x&callback=cb");
        let (status, env) = dispatcher().call("whoami", ApiVersion::V3, alice(), &req).await;
        assert_eq!(status, StatusCode::OK);
        let result = env.result.unwrap();
        assert_eq!(result["user"], "");
        assert_eq!(result["payload"], json!({"id": "x"}));
    }

    #[tokio::test]
    async fn callback_in_body_also_forces_anonymous() {
        let (_, env) = dispatcher()
            .call("whoami_write", ApiVersion::V3, alice(), &json_post(r#"{"callback": "x"}"#))
            .await;
        let result = env.result.unwrap();
        assert_eq!(result["user"], "");
        assert_eq!(result["payload"], json!({}));
    }

    #[tokio::test]
    async fn changed_entities_sorted() {
        let (status, env) = dispatcher()
            .call("package_patch", ApiVersion::V3, alice(), &json_post("{}"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            env.to_json()["changed_entities"],
            json!({"group": ["g"], "package": ["a", "b", "c"]})
        );
    }

    #[tokio::test]
    async fn failures_go_through_taxonomy_and_keep_help() {
        let d = dispatcher();
        let cases = [
            ("auth", StatusCode::FORBIDDEN, "Authorization Error"),
            ("missing", StatusCode::NOT_FOUND, "Not Found Error"),
            ("integrity", StatusCode::BAD_REQUEST, "Integrity Error"),
            ("other", StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        ];
        for (fail, want_status, want_type) in cases {
            let body = format!(r#"{{"fail": "{fail}"}}"#);
            let (status, env) = d.call("failing", ApiVersion::V3, alice(), &json_post(&body)).await;
            assert_eq!(status, want_status, "{fail}");
            assert!(!env.success);
            assert!(env.help.is_some());
            let rendered = env.to_json().to_string();
            assert!(rendered.contains(want_type));
            assert!(!rendered.contains("secret stack detail"));
        }
    }

    #[tokio::test]
    async fn dispatch_wraps_jsonp_for_get_success_only() {
        let d = dispatcher();
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/action/whoami?callback=foo")
            .body(Body::empty())
            .unwrap();
        let response = d.dispatch("whoami", ApiVersion::V3, alice(), req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript;charset=utf-8"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("foo({"));
        assert!(text.ends_with("});"));

        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/action/whoami_write?callback=foo")
            .body(Body::empty())
            .unwrap();
        let response = d.dispatch("whoami_write", ApiVersion::V3, alice(), req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"{"));
    }

    #[tokio::test]
    async fn invoke_direct_reports_missing_action() {
        let d = dispatcher();
        let err = d
            .invoke_direct("nope", ApiVersion::V1, Identity::Anonymous, &CallPayload::new())
            .await
            .unwrap_err();
        assert!(err.is_none());

        let params: MultiValueParams = [("q", "x")].into_iter().collect();
        let out = d
            .invoke_direct("whoami", ApiVersion::V1, alice(), &params.fold())
            .await
            .unwrap();
        assert_eq!(out["payload"], json!({"q": "x"}));
    }
}
