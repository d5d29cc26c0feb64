//! Integration test: identical setup code on compute and postprocess ranks.
//!
//! Both coordinators receive the same sequence of creation calls. Compute
//! keeps only producers, postprocess only consumers, and every routed pair
//! gets the same tag on both ranks, including pairs that are null on one
//! side.

use std::sync::Arc;

use tandem_channel::NullTransport;
use tandem_core::{CoordinatorError, LifecycleState, PluginTag, Role};
use tandem_engine::{
    ActivationSlot, Coordinator, GuardedConstructor, ObjectKind, RouteOutcome,
};
use tandem_test_utils::{
    particle_line, CallLog, ComputeOnlyKind, MockState, RecordingKind, RecordingProducer,
};

fn coordinator(role: Role) -> Coordinator {
    Coordinator::construct_in(Arc::new(ActivationSlot::new()), role, Arc::new(NullTransport))
        .unwrap()
}

/// The setup script every rank runs.
fn setup(c: &mut Coordinator, log: &CallLog) -> Vec<RouteOutcome> {
    vec![
        c.add::<RecordingKind>("stats", log).unwrap(),
        c.add::<ComputeOnlyKind>("force", log).unwrap(),
        c.add::<RecordingKind>("mesh", log).unwrap(),
    ]
}

#[test]
fn compute_rank_steps_producers_in_order() {
    let log = CallLog::new();
    let mut c = coordinator(Role::Compute);
    c.add::<RecordingKind>("stats", &log).unwrap();
    c.add::<RecordingKind>("mesh", &log).unwrap();

    let mut state = MockState::new(0.01).with_vector("solvent", particle_line(4, [1.0, 0.0, 0.0]));
    for _ in 0..3 {
        state.advance();
        c.step_all(Some(&mut state)).unwrap();
    }

    assert_eq!(c.compute_plugin_names(), vec!["stats", "mesh"]);
    assert!(c.postprocess_plugin_names().is_empty());
    assert_eq!(
        log.hooks("step"),
        vec![
            "stats:step:0",
            "mesh:step:0",
            "stats:step:1",
            "mesh:step:1",
            "stats:step:2",
            "mesh:step:2",
        ]
    );
}

#[test]
fn postprocess_rank_steps_only_consumers() {
    let log = CallLog::new();
    let mut c = coordinator(Role::Postprocess);
    c.add::<RecordingKind>("stats", &log).unwrap();
    c.add::<RecordingKind>("mesh", &log).unwrap();

    assert!(c.compute_plugin_names().is_empty());
    assert_eq!(c.postprocess_plugin_names(), vec!["stats", "mesh"]);

    c.step_all(None).unwrap();
    assert_eq!(log.hooks("step"), vec!["stats:step:0", "mesh:step:0"]);
}

#[test]
fn register_after_finalize_is_not_active() {
    let log = CallLog::new();
    let mut c = coordinator(Role::Compute);
    c.finalize().unwrap();
    assert_eq!(c.lifecycle(), LifecycleState::Finalized);
    let err = c
        .register_compute_plugin(Box::new(RecordingProducer::new("late", log)))
        .unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::NotActive {
            operation: "register a compute plugin",
            role: Role::Compute,
            state: LifecycleState::Finalized,
        }
    );
}

#[test]
fn tags_agree_across_roles() {
    let compute_log = CallLog::new();
    let post_log = CallLog::new();
    let mut compute = coordinator(Role::Compute);
    let mut post = coordinator(Role::Postprocess);

    let on_compute = setup(&mut compute, &compute_log);
    let on_post = setup(&mut post, &post_log);

    let compute_tags: Vec<PluginTag> = on_compute.iter().map(RouteOutcome::tag).collect();
    let post_tags: Vec<PluginTag> = on_post.iter().map(RouteOutcome::tag).collect();
    assert_eq!(compute_tags, post_tags);
    assert_eq!(compute_tags, vec![PluginTag(0), PluginTag(1), PluginTag(2)]);

    // The force plugin has no consumer: null pair on the postprocess rank.
    assert_eq!(on_post[1], RouteOutcome::Empty { tag: PluginTag(1) });
    assert_eq!(compute.plugin_tag("mesh"), post.plugin_tag("mesh"));
    assert_eq!(compute.next_tag(), post.next_tag());
}

#[test]
fn same_name_once_per_role_is_allowed() {
    let log = CallLog::new();
    let mut compute = coordinator(Role::Compute);
    let mut post = coordinator(Role::Postprocess);
    compute.add::<RecordingKind>("stats", &log).unwrap();
    post.add::<RecordingKind>("stats", &log).unwrap();
    assert!(matches!(
        compute.add::<RecordingKind>("stats", &log),
        Err(CoordinatorError::InvalidArgument { .. })
    ));
}

#[test]
fn name_reused_after_null_pair_rejected_on_every_role() {
    // "force" has no consumer, so the postprocess rank holds nothing under
    // that name. Reusing it must still fail there, exactly as on compute.
    for role in [Role::Compute, Role::Postprocess] {
        let log = CallLog::new();
        let mut c = coordinator(role);
        c.add::<ComputeOnlyKind>("force", &log).unwrap();
        let err = c.add::<RecordingKind>("force", &log).unwrap_err();
        assert!(
            matches!(err, CoordinatorError::InvalidArgument { ref plugin, .. } if plugin == "force"),
            "{role}: {err:?}"
        );
        assert_eq!(c.next_tag(), PluginTag(1), "{role}");
        assert!(c.postprocess_plugin_names().is_empty());
    }
}

#[test]
fn guarded_objects_exist_only_on_compute() {
    let compute = coordinator(Role::Compute);
    let post = coordinator(Role::Postprocess);
    let ctor = GuardedConstructor::new(ObjectKind::ParticleVector, |n: usize| {
        particle_line(n, [0.0; 3])
    });

    let pv = compute.make(&ctor, 8);
    let none = post.make(&ctor, 8);
    assert_eq!(pv.get().map(|p| p.len()), Some(8));
    assert!(none.is_null());
    // Null handles are still usable as setup-time values.
    let copy = none.clone();
    assert!(copy.is_null());
}

#[test]
fn checkpoint_reaches_every_plugin_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = CallLog::new();
    let mut c = coordinator(Role::Postprocess);
    setup(&mut c, &log);

    c.checkpoint(dir.path(), 4).unwrap();
    assert_eq!(
        log.hooks("checkpoint"),
        vec!["stats:checkpoint:4", "mesh:checkpoint:4"]
    );

    c.finalize().unwrap();
    assert!(matches!(
        c.checkpoint(dir.path(), 5),
        Err(CoordinatorError::NotActive { .. })
    ));
}
