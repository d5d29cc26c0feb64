//! Kind-name lookup for plugins declared in configuration.

use std::fmt;

use indexmap::IndexMap;
use tandem_core::{PluginError, Role};

use crate::args::{PluginArgs, PluginSpec};
use crate::factory::{create, PluginKind};
use crate::pair::PluginPair;

/// Builds one kind's role-local half from loosely-typed arguments.
pub type PluginBuilder = fn(Role, &str, &PluginArgs) -> Result<PluginPair, PluginError>;

/// Registered plugin kinds, in registration order.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    builders: IndexMap<&'static str, PluginBuilder>,
}

fn build_kind<K: PluginKind>(
    role: Role,
    name: &str,
    args: &PluginArgs,
) -> Result<PluginPair, PluginError> {
    let parsed = K::parse_args(args)?;
    create::<K>(role, name, &parsed)
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register kind `K` under [`PluginKind::KIND`], replacing any kind
    /// already registered under that name.
    pub fn register<K: PluginKind>(&mut self) -> &mut Self {
        self.builders.insert(K::KIND, build_kind::<K>);
        self
    }

    /// Whether `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    /// Registered kind names in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builders.keys().copied()
    }

    /// Build the half of `spec` that belongs on a rank of `role`.
    ///
    /// Returns `None` if `spec.kind` is not registered.
    pub fn build(
        &self,
        role: Role,
        spec: &PluginSpec,
    ) -> Option<Result<PluginPair, PluginError>> {
        let builder = self.builders.get(spec.kind.as_str())?;
        Some(builder(role, &spec.name, &spec.args))
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.builders.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::tests::Echo;

    #[test]
    fn registered_kind_builds_role_half() {
        let mut registry = PluginRegistry::new();
        registry.register::<Echo>();
        assert!(registry.contains("echo"));
        assert_eq!(registry.kinds().collect::<Vec<_>>(), vec!["echo"]);

        let spec = PluginSpec::new("echo", "e1", PluginArgs::new());
        let pair = registry.build(Role::Postprocess, &spec).unwrap().unwrap();
        assert!(pair.has_consumer());
        assert_eq!(pair.name(), "e1");
    }

    #[test]
    fn unknown_kind_is_none() {
        let registry = PluginRegistry::new();
        let spec = PluginSpec::new("nope", "x", PluginArgs::new());
        assert!(registry.build(Role::Compute, &spec).is_none());
    }
}
