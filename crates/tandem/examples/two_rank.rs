//! One compute rank and its postprocess peer, emulated as two threads.
//!
//! Both threads parse the same run config and run the same setup code.
//! The compute thread advances a small particle system; the postprocess
//! thread writes statistics and XYZ dumps into a temporary directory.
//!
//! ```sh
//! RUST_LOG=tandem_engine=debug cargo run --example two_rank
//! ```

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use tandem::plugins::builtin_registry;
use tandem::prelude::*;
use tandem_test_utils::{particle_line, MockState};
use tracing_subscriber::EnvFilter;

const WORLD_SIZE: u32 = 2;
const STEPS: u64 = 20;

fn config_text(out: &Path) -> String {
    let out = out.display();
    format!(
        r#"
        compute_grid = [1, 1, 1]
        recv_timeout_ms = 5000

        [checkpoint]
        every = 10
        folder = "{out}/restart"

        [[plugins]]
        kind = "stats"
        name = "stats"
        every = 5
        vectors = ["solvent"]
        path = "{out}/stats.csv"

        [[plugins]]
        kind = "add_force"
        name = "gravity"
        vector = "solvent"
        force = [0.0, 0.0, -0.5]

        [[plugins]]
        kind = "dump_xyz"
        name = "solvent"
        every = 10
        vector = "solvent"
        path = "{out}/xyz"
        "#
    )
}

fn run_rank(
    rank: u32,
    config: &RunConfig,
    transport: Arc<dyn Transport>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let layout = config.layout(WORLD_SIZE)?;
    let position = layout.position(rank)?;
    let mut c = Coordinator::from_position(Arc::new(ActivationSlot::new()), &position, transport)?;
    c.add_specs(&builtin_registry(), &config.plugins)?;

    // Only the compute rank ends up with a live particle vector.
    let solvent = c.make(
        &GuardedConstructor::new(ObjectKind::ParticleVector, |n: usize| {
            particle_line(n, [1.0, 0.0, 0.0])
        }),
        64,
    );
    let mut state = solvent
        .get()
        .map(|pv| MockState::new(0.01).with_vector("solvent", pv.clone()));

    for s in 0..STEPS {
        if let Some(state) = state.as_mut() {
            state.advance();
        }
        let metrics = c.step_all(state.as_mut().map(|st| st as &mut dyn SimulationState))?;
        tracing::debug!(role = %c.role(), step = s, total_us = metrics.total_us, "step done");
        if config.checkpoint_due(StepIndex(s)) {
            c.checkpoint(&config.checkpoint.folder, s)?;
        }
    }
    c.finalize()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    let out = tempfile::tempdir()?;
    let config = Arc::new(RunConfig::from_toml_str(&config_text(out.path()))?);
    let transport: Arc<dyn Transport> = Arc::new(match config.recv_timeout() {
        Some(timeout) => LocalTransport::with_timeout(timeout),
        None => LocalTransport::new(),
    });

    let handles = (0..WORLD_SIZE)
        .map(|rank| {
            let config = Arc::clone(&config);
            let transport = Arc::clone(&transport);
            thread::Builder::new()
                .name(format!("rank-{rank}"))
                .spawn(move || run_rank(rank, &config, transport))
        })
        .collect::<Result<Vec<_>, _>>()?;
    for handle in handles {
        handle.join().map_err(|_| "rank thread panicked")??;
    }

    let csv = std::fs::read_to_string(out.path().join("stats.csv"))?;
    println!("{csv}");
    for entry in std::fs::read_dir(out.path().join("xyz"))? {
        println!("wrote {}", entry?.path().display());
    }
    Ok(())
}
