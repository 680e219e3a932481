use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account name, as actions see it.
    pub name: String,
    /// Roles assigned to this principal for authorization checks.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }
}

/// Who is making the call. Passed explicitly; there is no ambient "current user".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl Identity {
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(principal) => Some(principal),
        }
    }

    /// Account name, or the empty string for anonymous callers.
    #[must_use]
    pub fn user_name(&self) -> &str {
        self.principal().map_or("", |p| p.name.as_str())
    }
}

/// Requested API version. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ApiVersion(u8);

impl ApiVersion {
    pub const V1: Self = Self(1);
    pub const V2: Self = Self(2);
    pub const V3: Self = Self(3);

    #[must_use]
    pub const fn new(version: u8) -> Option<Self> {
        if version == 0 {
            None
        } else {
            Some(Self(version))
        }
    }

    /// Parses a path segment, accepting it only inside `allowed`.
    #[must_use]
    pub fn parse_within(segment: &str, allowed: RangeInclusive<u8>) -> Option<Self> {
        let version: u8 = segment.parse().ok()?;
        if allowed.contains(&version) {
            Self::new(version)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entity ids an action reports as created, updated or deleted, keyed by entity type.
///
/// Ids are kept in ordered sets so the rendered lists are sorted ascending no
/// matter the order the action recorded them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedEntities(BTreeMap<String, BTreeSet<String>>);

impl ChangedEntities {
    pub fn record(&mut self, entity_type: impl Into<String>, id: impl Into<String>) {
        self.0.entry(entity_type.into()).or_default().insert(id.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entity type to ascending id list, as placed in the response envelope.
    #[must_use]
    pub fn to_sorted_lists(&self) -> BTreeMap<String, Vec<String>> {
        self.0
            .iter()
            .map(|(typ, ids)| (typ.clone(), ids.iter().cloned().collect()))
            .collect()
    }
}

/// Per-call context handed to an action alongside its payload.
///
/// `changed_entities` is an output channel: the action fills it in and the
/// dispatcher reads it after the call returns.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub identity: Identity,
    pub api_version: ApiVersion,
    pub changed_entities: ChangedEntities,
}

impl InvocationContext {
    #[must_use]
    pub fn new(identity: Identity, api_version: ApiVersion) -> Self {
        Self {
            identity,
            api_version,
            changed_entities: ChangedEntities::default(),
        }
    }

    /// Drops the caller identity for the rest of the call.
    pub fn force_anonymous(&mut self) {
        self.identity = Identity::Anonymous;
    }

    /// Records that the action changed entity `id` of type `entity_type`.
    pub fn record_change(&mut self, entity_type: impl Into<String>, id: impl Into<String>) {
        self.changed_entities.record(entity_type, id);
    }
}
