//! Role-aware plugin creation.
//!
//! Setup code runs identically on every rank. Creating a plugin on a
//! compute rank builds only its producer half; on a postprocess rank only
//! its consumer half. Both halves are built from the same name and the
//! same parsed arguments, so each rank derives the plugin's cadence on
//! its own.

use tandem_core::{PluginError, Role};

use crate::args::PluginArgs;
use crate::pair::PluginPair;
use crate::plugin::{PostprocessPlugin, SimulationPlugin};

/// A plugin kind: how to parse its arguments and build either half.
///
/// A kind that has no behavior on one role returns `Ok(None)` for that
/// half.
pub trait PluginKind {
    /// Kind name used in configuration.
    const KIND: &'static str;

    /// Parsed creation arguments, shared by both halves.
    type Args;

    /// Parse loosely-typed arguments into [`Self::Args`].
    fn parse_args(args: &PluginArgs) -> Result<Self::Args, PluginError>;

    /// Build the producer half.
    fn producer(
        name: &str,
        args: &Self::Args,
    ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError>;

    /// Build the consumer half.
    fn consumer(
        name: &str,
        args: &Self::Args,
    ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError>;
}

/// Build the half of kind `K` that belongs on a rank of `role`.
///
/// Returns `(producer, null)` on compute ranks and `(null, consumer)` on
/// postprocess ranks, or a fully-null pair if `K` has no half for `role`.
/// The other half's constructor is never called.
///
/// # Errors
///
/// [`PluginError::InvalidArgument`] if `name` is empty or the built half
/// reports a different name; any error from the half's constructor.
pub fn create<K: PluginKind>(
    role: Role,
    name: &str,
    args: &K::Args,
) -> Result<PluginPair, PluginError> {
    if name.is_empty() {
        return Err(PluginError::InvalidArgument {
            reason: "plugin name must not be empty".into(),
        });
    }

    let pair = match role {
        Role::Compute => match K::producer(name, args)? {
            Some(p) => PluginPair::producer(K::KIND, p),
            None => PluginPair::empty(K::KIND, name),
        },
        Role::Postprocess => match K::consumer(name, args)? {
            Some(c) => PluginPair::consumer(K::KIND, c),
            None => PluginPair::empty(K::KIND, name),
        },
    };

    if pair.name() != name {
        return Err(PluginError::InvalidArgument {
            reason: format!(
                "kind '{}' built a half named '{}' for plugin '{name}'",
                K::KIND,
                pair.name()
            ),
        });
    }
    Ok(pair)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::context::{PostprocessContext, SimulationContext};
    use proptest::prelude::*;

    pub(crate) struct Named(pub String);

    impl SimulationPlugin for Named {
        fn name(&self) -> &str {
            &self.0
        }
        fn step(&mut self, _ctx: &mut SimulationContext<'_>) -> Result<(), PluginError> {
            Ok(())
        }
    }

    impl PostprocessPlugin for Named {
        fn name(&self) -> &str {
            &self.0
        }
        fn step(&mut self, _ctx: &mut PostprocessContext<'_>) -> Result<(), PluginError> {
            Ok(())
        }
    }

    /// Symmetric kind with a half for each role.
    pub(crate) struct Echo;

    impl PluginKind for Echo {
        const KIND: &'static str = "echo";
        type Args = ();

        fn parse_args(_args: &PluginArgs) -> Result<(), PluginError> {
            Ok(())
        }

        fn producer(
            name: &str,
            _args: &(),
        ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
            Ok(Some(Box::new(Named(name.to_string()))))
        }

        fn consumer(
            name: &str,
            _args: &(),
        ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
            Ok(Some(Box::new(Named(name.to_string()))))
        }
    }

    /// Kind whose halves refuse to be built for any role but `args`.
    struct Exclusive;

    impl PluginKind for Exclusive {
        const KIND: &'static str = "exclusive";
        type Args = Role;

        fn parse_args(_args: &PluginArgs) -> Result<Role, PluginError> {
            Ok(Role::Compute)
        }

        fn producer(
            name: &str,
            allowed: &Role,
        ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
            if *allowed != Role::Compute {
                return Err(PluginError::ExecutionFailed {
                    reason: "producer built on a postprocess rank".into(),
                });
            }
            Ok(Some(Box::new(Named(name.to_string()))))
        }

        fn consumer(
            name: &str,
            allowed: &Role,
        ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
            if *allowed != Role::Postprocess {
                return Err(PluginError::ExecutionFailed {
                    reason: "consumer built on a compute rank".into(),
                });
            }
            Ok(Some(Box::new(Named(name.to_string()))))
        }
    }

    /// Kind whose producer names itself wrongly.
    struct Misnamed;

    impl PluginKind for Misnamed {
        const KIND: &'static str = "misnamed";
        type Args = ();

        fn parse_args(_args: &PluginArgs) -> Result<(), PluginError> {
            Ok(())
        }

        fn producer(
            _name: &str,
            _args: &(),
        ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
            Ok(Some(Box::new(Named("other".into()))))
        }

        fn consumer(
            _name: &str,
            _args: &(),
        ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
            Ok(None)
        }
    }

    #[test]
    fn compute_gets_producer_only() {
        let pair = create::<Exclusive>(Role::Compute, "stats", &Role::Compute).unwrap();
        assert!(pair.has_producer());
        assert!(!pair.has_consumer());
        assert_eq!(pair.role(), Some(Role::Compute));
        assert_eq!(pair.name(), "stats");
        assert_eq!(pair.kind(), "exclusive");
    }

    #[test]
    fn postprocess_gets_consumer_only() {
        let pair =
            create::<Exclusive>(Role::Postprocess, "stats", &Role::Postprocess).unwrap();
        assert!(pair.has_consumer());
        assert!(!pair.has_producer());
        assert_eq!(pair.role(), Some(Role::Postprocess));
    }

    #[test]
    fn half_without_behavior_yields_empty_pair() {
        let pair = create::<Misnamed>(Role::Postprocess, "m", &()).unwrap();
        assert!(pair.is_empty());
        assert_eq!(pair.role(), None);
        assert_eq!(pair.name(), "m");
    }

    #[test]
    fn empty_name_rejected() {
        assert!(matches!(
            create::<Echo>(Role::Compute, "", &()),
            Err(PluginError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn misnamed_half_rejected() {
        assert!(matches!(
            create::<Misnamed>(Role::Compute, "m", &()),
            Err(PluginError::InvalidArgument { .. })
        ));
    }

    proptest! {
        #[test]
        fn exactly_one_half_matching_role(
            name in "[a-z][a-z0-9_]{0,12}",
            compute in any::<bool>(),
        ) {
            let role = if compute { Role::Compute } else { Role::Postprocess };
            let pair = create::<Echo>(role, &name, &()).unwrap();
            prop_assert!(pair.has_producer() != pair.has_consumer());
            prop_assert_eq!(pair.role(), Some(role));
            prop_assert_eq!(pair.name(), name.as_str());
        }
    }
}
