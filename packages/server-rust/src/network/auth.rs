//! Caller identity resolution from request headers.
//!
//! The gateway never decides who a caller is on its own: a resolver maps
//! request headers to an [`Identity`] and the result is handed to the
//! dispatcher explicitly.

use std::fmt;

use axum::http::{header, HeaderMap};
use catalog_core::{Identity, Principal};
use subtle::ConstantTimeEq;

/// Header carrying an API token, alongside `Authorization`.
pub const API_KEY_HEADER: &str = "x-ckan-api-key";

/// Maps request headers to the caller identity.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Identity;
}

/// Treats every caller as anonymous.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousResolver;

impl IdentityResolver for AnonymousResolver {
    fn resolve(&self, _headers: &HeaderMap) -> Identity {
        Identity::Anonymous
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenConfigError {
    #[error("token entry {0:?} is not of the form <token>=<user>")]
    Malformed(String),
    #[error("token entry for user {0:?} has an empty token")]
    EmptyToken(String),
}

/// Static API tokens, each bound to one principal.
#[derive(Clone, Default)]
pub struct ApiTokenResolver {
    tokens: Vec<(String, Principal)>,
}

impl ApiTokenResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.push((token.into(), principal));
        self
    }

    /// Parses `token=user` entries separated by commas.
    ///
    /// # Errors
    ///
    /// Returns `TokenConfigError` for an entry without `=` or with an empty token.
    pub fn parse(entries: &str) -> Result<Self, TokenConfigError> {
        let mut resolver = Self::new();
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, user) = entry
                .split_once('=')
                .ok_or_else(|| TokenConfigError::Malformed(entry.to_string()))?;
            let (token, user) = (token.trim(), user.trim());
            if user.is_empty() {
                return Err(TokenConfigError::Malformed(entry.to_string()));
            }
            if token.is_empty() {
                return Err(TokenConfigError::EmptyToken(user.to_string()));
            }
            resolver = resolver.with_token(token, Principal::new(user));
        }
        Ok(resolver)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn find(&self, presented: &str) -> Option<&Principal> {
        // Every configured token is compared so timing does not reveal which one matched.
        let mut found = None;
        for (token, principal) in &self.tokens {
            if token.as_bytes().ct_eq(presented.as_bytes()).unwrap_u8() == 1 {
                found = Some(principal);
            }
        }
        found
    }
}

impl fmt::Debug for ApiTokenResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTokenResolver")
            .field("tokens", &format_args!("<{} redacted>", self.tokens.len()))
            .finish()
    }
}

impl IdentityResolver for ApiTokenResolver {
    fn resolve(&self, headers: &HeaderMap) -> Identity {
        [header::AUTHORIZATION.as_str(), API_KEY_HEADER]
            .into_iter()
            .filter_map(|name| presented_token(headers, name))
            .find_map(|token| self.find(token))
            .map_or(Identity::Anonymous, |principal| {
                Identity::Authenticated(principal.clone())
            })
    }
}

/// Token carried by header `name`, bare or as `Bearer <token>`.
fn presented_token<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    let raw = headers
        .get(name)?
        .to_str()
        .ok()?
        .trim();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    (!token.is_empty()).then_some(token)
}
