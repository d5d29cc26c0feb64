//! Integration test: a compute rank and its postprocess peer emulated as
//! two threads sharing a `LocalTransport`.
//!
//! Each thread builds its own coordinator in its own activation slot from
//! the same setup code, then both step in lockstep. Every frame a producer
//! sends must reach its consumer, on the same step, in order.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tandem_channel::{LocalTransport, Transport};
use tandem_core::{CoordinatorError, PluginError, RankLayout, Role};
use tandem_engine::{ActivationSlot, Coordinator};
use tandem_test_utils::{
    particle_line, CallLog, MockState, RecordingConsumer, RecordingProducer,
};

const STEPS: u64 = 5;

fn run_rank(
    rank: u32,
    layout: RankLayout,
    transport: Arc<dyn Transport>,
    log: CallLog,
) -> Result<Role, CoordinatorError> {
    let position = layout.position(rank).expect("rank in world");
    let mut c = Coordinator::from_position(Arc::new(ActivationSlot::new()), &position, transport)?;
    match c.role() {
        Role::Compute => {
            c.register_compute_plugin(Box::new(
                RecordingProducer::new("samples", log.clone()).sending(),
            ))?;
            let mut state =
                MockState::new(0.1).with_vector("solvent", particle_line(2, [0.5, 0.0, 0.0]));
            for _ in 0..STEPS {
                state.advance();
                c.step_all(Some(&mut state))?;
            }
        }
        Role::Postprocess => {
            c.register_postprocess_plugin(Box::new(
                RecordingConsumer::new("samples", log.clone()).receiving(),
            ))?;
            for _ in 0..STEPS {
                c.step_all(None)?;
            }
        }
    }
    let role = c.role();
    c.finalize()?;
    Ok(role)
}

#[test]
fn every_sample_reaches_consumer_in_step_order() {
    let layout = RankLayout::new([1, 1, 1], 2).unwrap();
    let transport: Arc<dyn Transport> =
        Arc::new(LocalTransport::with_timeout(Duration::from_secs(5)));
    let compute_log = CallLog::new();
    let post_log = CallLog::new();

    let handles: Vec<_> = [(0, compute_log.clone()), (1, post_log.clone())]
        .into_iter()
        .map(|(rank, log)| {
            let transport = Arc::clone(&transport);
            thread::spawn(move || run_rank(rank, layout, transport, log))
        })
        .collect();
    let roles: Vec<Role> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    assert_eq!(roles, vec![Role::Compute, Role::Postprocess]);

    let received: Vec<String> = post_log
        .entries()
        .into_iter()
        .filter(|e| e.contains(":received:"))
        .collect();
    let expected: Vec<String> = (0..STEPS).map(|s| format!("samples:received:{s}")).collect();
    assert_eq!(received, expected);
    assert_eq!(compute_log.hooks("step").len(), STEPS as usize);
}

#[test]
fn consumer_times_out_without_producer() {
    let layout = RankLayout::new([1, 1, 1], 2).unwrap();
    let transport: Arc<dyn Transport> =
        Arc::new(LocalTransport::with_timeout(Duration::from_millis(20)));
    let position = layout.position(1).unwrap();
    let mut c =
        Coordinator::from_position(Arc::new(ActivationSlot::new()), &position, transport).unwrap();
    c.register_postprocess_plugin(Box::new(
        RecordingConsumer::new("samples", CallLog::new()).receiving(),
    ))
    .unwrap();

    match c.step_all(None) {
        Err(CoordinatorError::PluginFailed { plugin, reason, .. }) => {
            assert_eq!(plugin, "samples");
            assert!(matches!(reason, PluginError::Channel(_)));
        }
        other => panic!("expected PluginFailed, got {other:?}"),
    }
}
