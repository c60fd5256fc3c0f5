//! Role registry for Roleplex
//!
//! This module provides the `RoleProvider` struct mapping role tags to
//! constructors. Roles are added by explicit registration; adding a variant
//! means registering one more tag, with no change to the agent or registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, RuntimeError};

use super::{EchoRole, Role};

/// Constructor stored for one role tag.
pub type RoleFactory = Arc<dyn Fn() -> Box<dyn Role> + Send + Sync>;

/// A registry that maps role tags to constructors.
///
/// Build one at process start, register every role, then share it (usually as
/// `Arc<RoleProvider>`) with the agents that need to resolve roles. Every call
/// to [`create_role`](Self::create_role) returns a fresh instance, so two
/// agents never share role state.
///
/// # Example
///
/// ```rust
/// use roleplex::roles::{EchoRole, RoleProvider};
///
/// let mut provider = RoleProvider::new();
/// provider.register("echo", || Box::new(EchoRole::new()));
///
/// assert!(provider.has("echo"));
/// assert!(provider.create_role("echo").is_some());
/// assert!(provider.create_role("does-not-exist").is_none());
/// ```
#[derive(Default, Clone)]
pub struct RoleProvider {
    factories: HashMap<String, RoleFactory>,
}

impl RoleProvider {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the built-in roles (`echo`) registered.
    pub fn with_builtin_roles() -> Self {
        let mut provider = Self::new();
        provider.register_default::<EchoRole>(EchoRole::TAG);
        provider
    }

    /// Register a constructor under `role_type`.
    ///
    /// If the tag is already registered, the constructor is replaced.
    pub fn register<F>(&mut self, role_type: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Role> + Send + Sync + 'static,
    {
        let role_type = role_type.into();
        info!(role_type = %role_type, "Registering role");
        self.factories.insert(role_type, Arc::new(factory));
    }

    /// Register a role type constructed through `Default`.
    pub fn register_default<R>(&mut self, role_type: impl Into<String>)
    where
        R: Role + Default + 'static,
    {
        self.register(role_type, || Box::new(R::default()));
    }

    /// Remove a tag. Returns `true` if it was registered.
    pub fn unregister(&mut self, role_type: &str) -> bool {
        self.factories.remove(role_type).is_some()
    }

    /// Build a fresh role for `role_type`, or `None` if the tag is unknown.
    pub fn create_role(&self, role_type: &str) -> Option<Box<dyn Role>> {
        let factory = self.factories.get(role_type)?;
        debug!(role_type = %role_type, "Creating role instance");
        Some(factory())
    }

    /// Like [`create_role`](Self::create_role), with a typed miss.
    pub fn resolve(&self, role_type: &str) -> Result<Box<dyn Role>> {
        self.create_role(role_type)
            .ok_or_else(|| RuntimeError::UnknownRole(role_type.to_string()))
    }

    /// Check if a tag is registered.
    pub fn has(&self, role_type: &str) -> bool {
        self.factories.contains_key(role_type)
    }

    /// All registered tags, sorted.
    pub fn role_types(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for RoleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleProvider")
            .field("role_types", &self.role_types())
            .finish()
    }
}
