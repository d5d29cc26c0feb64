//! Role-guarded construction of engine objects.
//!
//! Setup code calls the same constructors on every rank. Objects that only
//! make sense on compute ranks are wrapped in a [`GuardedConstructor`],
//! which runs the real constructor when the caller's role matches and
//! hands back a Null [`Handle`] otherwise.

use std::fmt;

use tandem_core::{Handle, Role};

/// The closed set of engine object kinds that setup code constructs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Particle vector.
    ParticleVector,
    /// Object vector (membranes, rigid bodies).
    ObjectVector,
    /// Initial conditions.
    InitialConditions,
    /// Time integrator.
    Integrator,
    /// Pairwise interaction.
    Interaction,
    /// Wall geometry.
    Wall,
    /// Bounce-back handler.
    Bouncer,
    /// Inside/outside checker for object vectors.
    BelongingChecker,
}

impl ObjectKind {
    /// Every kind, in declaration order.
    pub const ALL: [ObjectKind; 8] = [
        Self::ParticleVector,
        Self::ObjectVector,
        Self::InitialConditions,
        Self::Integrator,
        Self::Interaction,
        Self::Wall,
        Self::Bouncer,
        Self::BelongingChecker,
    ];

    /// The role a rank must have for objects of this kind to exist on it.
    pub fn required_role(self) -> Role {
        match self {
            Self::ParticleVector
            | Self::ObjectVector
            | Self::InitialConditions
            | Self::Integrator
            | Self::Interaction
            | Self::Wall
            | Self::Bouncer
            | Self::BelongingChecker => Role::Compute,
        }
    }

    /// Snake-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::ParticleVector => "particle_vector",
            Self::ObjectVector => "object_vector",
            Self::InitialConditions => "initial_conditions",
            Self::Integrator => "integrator",
            Self::Interaction => "interaction",
            Self::Wall => "wall",
            Self::Bouncer => "bouncer",
            Self::BelongingChecker => "belonging_checker",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A constructor that only runs on ranks of its kind's required role.
pub struct GuardedConstructor<A, T> {
    kind: ObjectKind,
    ctor: Box<dyn Fn(A) -> T + Send + Sync>,
}

impl<A, T> GuardedConstructor<A, T> {
    /// Wrap `ctor` as the constructor for objects of `kind`.
    pub fn new(kind: ObjectKind, ctor: impl Fn(A) -> T + Send + Sync + 'static) -> Self {
        Self {
            kind,
            ctor: Box::new(ctor),
        }
    }

    /// The object kind this constructor builds.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Construct on a rank of `role`.
    ///
    /// If `role` is not the kind's required role the wrapped constructor
    /// is not called and a Null handle is returned.
    pub fn make(&self, role: Role, args: A) -> Handle<T> {
        if role != self.kind.required_role() {
            tracing::trace!(kind = %self.kind, role = %role, "construction skipped");
            return Handle::null();
        }
        Handle::live((self.ctor)(args))
    }
}

impl<A, T> fmt::Debug for GuardedConstructor<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedConstructor")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tandem_test_utils::ConstructorCounter;

    #[test]
    fn every_kind_is_compute_only() {
        assert_eq!(ObjectKind::ALL.len(), 8);
        for kind in ObjectKind::ALL {
            assert_eq!(kind.required_role(), Role::Compute);
        }
    }

    #[test]
    fn compute_rank_builds_object() {
        let counter = ConstructorCounter::new();
        let ctor = GuardedConstructor::new(
            ObjectKind::ParticleVector,
            counter.wrap(|n: usize| vec![0.0f32; n]),
        );
        let pv = ctor.make(Role::Compute, 4);
        assert_eq!(pv.get().map(Vec::len), Some(4));
        assert_eq!(counter.calls(), 1);
    }

    #[test]
    fn postprocess_rank_gets_null_without_calling() {
        let counter = ConstructorCounter::new();
        let ctor = GuardedConstructor::new(ObjectKind::Wall, counter.wrap(|_: ()| "wall"));
        let wall = ctor.make(Role::Postprocess, ());
        assert!(wall.is_null());
        assert_eq!(counter.calls(), 0);
    }

    proptest! {
        #[test]
        fn mismatched_role_never_invokes(idx in 0usize..8, calls in 1usize..10) {
            let kind = ObjectKind::ALL[idx];
            let counter = ConstructorCounter::new();
            let ctor = GuardedConstructor::new(kind, counter.wrap(|x: u32| x));
            for i in 0..calls {
                prop_assert!(ctor.make(kind.required_role().opposite(), i as u32).is_null());
            }
            prop_assert_eq!(counter.calls(), 0);
        }
    }
}
