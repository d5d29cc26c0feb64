//! Reusable plugin test fixtures.
//!
//! - [`RecordingProducer`] / [`RecordingConsumer`]: append every hook call
//!   to a shared [`CallLog`].
//! - [`FailingProducer`]: fails deterministically after N steps.
//! - [`ConstructorCounter`]: counts how often a wrapped constructor ran.
//! - [`RecordingKind`] / [`ComputeOnlyKind`]: plugin kinds built from the
//!   recording halves.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tandem_core::PluginError;
use tandem_plugin::{
    PluginArgs, PluginKind, PostprocessContext, PostprocessPlugin, SetupContext,
    SimulationContext, SimulationPlugin,
};

/// Shared, ordered log of hook calls, formatted `"<name>:<hook>"` with the
/// step appended for step hooks (`"stats:step:2"`).
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    /// Snapshot of all entries so far.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries whose hook is `hook`, e.g. `"step"`.
    pub fn hooks(&self, hook: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.split(':').nth(1) == Some(hook))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Producer half that records its hooks and optionally sends the step
/// number to its consumer.
pub struct RecordingProducer {
    pub name: String,
    pub log: CallLog,
    pub needs_postprocess: bool,
    pub send: bool,
}

impl RecordingProducer {
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
            needs_postprocess: true,
            send: false,
        }
    }

    /// Mark as a producer with no consumer half.
    pub fn compute_only(mut self) -> Self {
        self.needs_postprocess = false;
        self
    }

    /// Send the step index as an 8-byte payload on every step.
    pub fn sending(mut self) -> Self {
        self.send = true;
        self
    }
}

impl SimulationPlugin for RecordingProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn needs_postprocess(&self) -> bool {
        self.needs_postprocess
    }

    fn setup(&mut self, ctx: &SetupContext) -> Result<(), PluginError> {
        self.log.push(format!("{}:setup:{}", self.name, ctx.tag()));
        Ok(())
    }

    fn step(&mut self, ctx: &mut SimulationContext<'_>) -> Result<(), PluginError> {
        self.log.push(format!("{}:step:{}", self.name, ctx.step()));
        if self.send {
            ctx.send(ctx.step().0.to_le_bytes().to_vec())?;
        }
        Ok(())
    }

    fn checkpoint(&mut self, _folder: &Path, id: u64) -> Result<(), PluginError> {
        self.log.push(format!("{}:checkpoint:{id}", self.name));
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), PluginError> {
        self.log.push(format!("{}:finalize", self.name));
        Ok(())
    }
}

/// Consumer half that records its hooks and optionally receives the
/// producer's step payload, checking it matches the current step.
pub struct RecordingConsumer {
    pub name: String,
    pub log: CallLog,
    pub receive: bool,
}

impl RecordingConsumer {
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
            receive: false,
        }
    }

    /// Receive one frame per step.
    pub fn receiving(mut self) -> Self {
        self.receive = true;
        self
    }
}

impl PostprocessPlugin for RecordingConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &SetupContext) -> Result<(), PluginError> {
        self.log.push(format!("{}:setup:{}", self.name, ctx.tag()));
        Ok(())
    }

    fn step(&mut self, ctx: &mut PostprocessContext<'_>) -> Result<(), PluginError> {
        if self.receive {
            let payload = ctx.receive_current()?;
            let bytes: [u8; 8] = payload.as_slice().try_into().map_err(|_| {
                PluginError::ExecutionFailed {
                    reason: format!("expected 8 bytes, got {}", payload.len()),
                }
            })?;
            self.log.push(format!(
                "{}:received:{}",
                self.name,
                u64::from_le_bytes(bytes)
            ));
        }
        self.log.push(format!("{}:step:{}", self.name, ctx.step()));
        Ok(())
    }

    fn checkpoint(&mut self, _folder: &Path, id: u64) -> Result<(), PluginError> {
        self.log.push(format!("{}:checkpoint:{id}", self.name));
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), PluginError> {
        self.log.push(format!("{}:finalize", self.name));
        Ok(())
    }
}

/// Fails deterministically after a configurable number of successful
/// steps. Can also be set to fail in `finalize`.
pub struct FailingProducer {
    pub name: String,
    pub succeed_count: usize,
    pub fail_finalize: bool,
    call_count: AtomicUsize,
}

impl FailingProducer {
    /// Create a producer that succeeds `succeed_count` times then fails.
    pub fn new(name: impl Into<String>, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            succeed_count,
            fail_finalize: false,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Also fail in `finalize`.
    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    /// How many times `step()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl SimulationPlugin for FailingProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, _ctx: &mut SimulationContext<'_>) -> Result<(), PluginError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(PluginError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), PluginError> {
        if self.fail_finalize {
            return Err(PluginError::ExecutionFailed {
                reason: "deliberate finalize failure".into(),
            });
        }
        Ok(())
    }
}

/// Counts invocations of constructors wrapped with [`wrap`](Self::wrap).
#[derive(Clone, Debug, Default)]
pub struct ConstructorCounter(Arc<AtomicUsize>);

impl ConstructorCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `ctor` so every call bumps the counter.
    pub fn wrap<A, T>(
        &self,
        ctor: impl Fn(A) -> T + Send + Sync + 'static,
    ) -> impl Fn(A) -> T + Send + Sync + 'static {
        let count = Arc::clone(&self.0);
        move |args| {
            count.fetch_add(1, Ordering::SeqCst);
            ctor(args)
        }
    }

    pub fn calls(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Plugin kind whose halves are [`RecordingProducer`] and
/// [`RecordingConsumer`], both sharing the log passed as arguments.
pub struct RecordingKind;

impl PluginKind for RecordingKind {
    const KIND: &'static str = "recording";
    type Args = CallLog;

    fn parse_args(_args: &PluginArgs) -> Result<CallLog, PluginError> {
        Ok(CallLog::new())
    }

    fn producer(
        name: &str,
        log: &CallLog,
    ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
        Ok(Some(Box::new(RecordingProducer::new(name, log.clone()))))
    }

    fn consumer(
        name: &str,
        log: &CallLog,
    ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
        Ok(Some(Box::new(RecordingConsumer::new(name, log.clone()))))
    }
}

/// Plugin kind with a compute-only producer and no consumer.
pub struct ComputeOnlyKind;

impl PluginKind for ComputeOnlyKind {
    const KIND: &'static str = "compute_only";
    type Args = CallLog;

    fn parse_args(_args: &PluginArgs) -> Result<CallLog, PluginError> {
        Ok(CallLog::new())
    }

    fn producer(
        name: &str,
        log: &CallLog,
    ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
        Ok(Some(Box::new(
            RecordingProducer::new(name, log.clone()).compute_only(),
        )))
    }

    fn consumer(
        _name: &str,
        _log: &CallLog,
    ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
        Ok(None)
    }
}
