//! The per-process plugin coordinator.
//!
//! [`Coordinator`] is the explicit context object setup code passes to
//! every creation call. It knows the process's [`Role`], owns the
//! role-local plugin lists, and drives every plugin hook in registration
//! order when the engine steps, checkpoints or shuts down.
//!
//! # Lifecycle
//!
//! `construct` → Active → `finalize` → Finalized. Registration, stepping
//! and checkpointing are valid only while Active. At most one coordinator
//! is Active per [`ActivationSlot`]; the process-wide slot is used unless
//! a slot is passed explicitly.
//!
//! # Ownership model
//!
//! `Coordinator` is [`Send`] but not [`Sync`]. All mutating methods take
//! `&mut self`, so plugin lists are never mutated while a hook runs.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};
use tandem_channel::Transport;
use tandem_core::{
    CoordinatorError, Handle, LifecycleState, PartitionMode, PluginError, PluginHook, PluginTag,
    RankPosition, Role, StepIndex,
};
use tandem_plugin::{
    create, PluginKind, PluginPair, PluginRegistry, PluginSpec, PostprocessContext,
    PostprocessPlugin, SetupContext, SimulationContext, SimulationPlugin, SimulationState,
};

use crate::guarded::GuardedConstructor;
use crate::metrics::StepMetrics;
use crate::router::{route, RouteOutcome};
use crate::slot::ActivationSlot;

// Compile-time assertion: Coordinator is Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Coordinator>();
    }
};

// ── Registration ────────────────────────────────────────────────

/// Result of a successful registration call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The plugin joined the role-local list under this tag.
    Registered(PluginTag),
    /// The producer needs a postprocess rank and there is none; it was
    /// dropped, but its tag was still consumed.
    Skipped(PluginTag),
}

impl Registration {
    /// The tag consumed by the registration.
    pub fn tag(&self) -> PluginTag {
        match *self {
            Self::Registered(tag) | Self::Skipped(tag) => tag,
        }
    }
}

struct Registered<P: ?Sized> {
    tag: PluginTag,
    set_up: bool,
    plugin: Box<P>,
}

impl<P: ?Sized> Registered<P> {
    fn new(tag: PluginTag, plugin: Box<P>) -> Self {
        Self {
            tag,
            set_up: false,
            plugin,
        }
    }
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

fn plugin_failed(
    plugin: &str,
    role: Role,
    hook: PluginHook,
    step: StepIndex,
    reason: PluginError,
) -> CoordinatorError {
    tracing::error!(
        role = %role,
        plugin = %plugin,
        hook = %hook,
        step = step.0,
        error = %reason,
        "plugin hook failed"
    );
    CoordinatorError::PluginFailed {
        plugin: plugin.to_string(),
        role,
        hook,
        step,
        reason,
    }
}

/// Hand out a reborrow of the optional engine state for one hook call.
fn reborrow<'s>(
    state: &'s mut Option<&mut dyn SimulationState>,
) -> Option<&'s mut dyn SimulationState> {
    match state {
        Some(s) => Some(&mut **s),
        None => None,
    }
}

// ── Coordinator ─────────────────────────────────────────────────

/// Owns the role-local plugin list of one process and drives its hooks.
///
/// # Example
///
/// ```ignore
/// let mut coordinator = Coordinator::construct(role, transport)?;
/// coordinator.add::<Stats>("stats", &stats_args)?;
/// coordinator.add::<DumpMesh>("mesh", &mesh_args)?;
/// for _ in 0..steps {
///     coordinator.step_all(state.as_mut())?;
/// }
/// coordinator.finalize()?;
/// ```
pub struct Coordinator {
    role: Role,
    slot: Arc<ActivationSlot>,
    transport: Arc<dyn Transport>,
    postprocess_enabled: bool,
    state: LifecycleState,
    compute_plugins: IndexMap<String, Registered<dyn SimulationPlugin>>,
    postprocess_plugins: IndexMap<String, Registered<dyn PostprocessPlugin>>,
    // Every name that consumed a tag, whether its half was kept, skipped or
    // null here. Identical on all ranks running the same setup code.
    routed_names: IndexSet<String>,
    next_tag: u32,
    step: StepIndex,
}

impl Coordinator {
    /// Activate a coordinator for `role` in the process-wide slot.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::AlreadyActive`] if another coordinator is
    /// active in this process. The existing coordinator is unaffected.
    pub fn construct(role: Role, transport: Arc<dyn Transport>) -> Result<Self, CoordinatorError> {
        Self::construct_in(ActivationSlot::process(), role, transport)
    }

    /// Activate a coordinator for `role` in an explicit slot.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::AlreadyActive`] if the slot is taken.
    pub fn construct_in(
        slot: Arc<ActivationSlot>,
        role: Role,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CoordinatorError> {
        if !slot.try_acquire() {
            tracing::warn!(role = %role, "coordinator already active");
            return Err(CoordinatorError::AlreadyActive { role });
        }
        tracing::info!(role = %role, "coordinator active");
        Ok(Self {
            role,
            slot,
            transport,
            postprocess_enabled: true,
            state: LifecycleState::Active,
            compute_plugins: IndexMap::new(),
            postprocess_plugins: IndexMap::new(),
            routed_names: IndexSet::new(),
            next_tag: 0,
            step: StepIndex(0),
        })
    }

    /// Activate a coordinator for a classified rank.
    ///
    /// In [`PartitionMode::ComputeOnly`] runs there is no postprocess
    /// rank, so producers that need one are skipped at registration.
    pub fn from_position(
        slot: Arc<ActivationSlot>,
        position: &RankPosition,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CoordinatorError> {
        let mut coordinator = Self::construct_in(slot, position.classify(), transport)?;
        coordinator.postprocess_enabled = position.mode() == PartitionMode::Interleaved;
        if !coordinator.postprocess_enabled {
            tracing::info!(
                rank = position.world_rank(),
                "no postprocess ranks: producers needing postprocess will be skipped"
            );
        }
        Ok(coordinator)
    }

    // ── Accessors ───────────────────────────────────────────────

    /// This process's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> LifecycleState {
        self.state
    }

    /// Whether postprocess ranks exist in this run.
    pub fn postprocess_enabled(&self) -> bool {
        self.postprocess_enabled
    }

    /// The step the next `step_all` call will run.
    pub fn current_step(&self) -> StepIndex {
        self.step
    }

    /// The tag the next routed pair will get.
    pub fn next_tag(&self) -> PluginTag {
        PluginTag(self.next_tag)
    }

    /// Names of registered producers, in registration order.
    pub fn compute_plugin_names(&self) -> Vec<&str> {
        self.compute_plugins.keys().map(String::as_str).collect()
    }

    /// Names of registered consumers, in registration order.
    pub fn postprocess_plugin_names(&self) -> Vec<&str> {
        self.postprocess_plugins.keys().map(String::as_str).collect()
    }

    /// Tag of a plugin registered on this rank.
    pub fn plugin_tag(&self, name: &str) -> Option<PluginTag> {
        match self.role {
            Role::Compute => self.compute_plugins.get(name).map(|r| r.tag),
            Role::Postprocess => self.postprocess_plugins.get(name).map(|r| r.tag),
        }
    }

    /// Whether a plugin of this name is registered on this rank.
    pub fn contains(&self, name: &str) -> bool {
        match self.role {
            Role::Compute => self.compute_plugins.contains_key(name),
            Role::Postprocess => self.postprocess_plugins.contains_key(name),
        }
    }

    fn ensure_active(&self, operation: &'static str) -> Result<(), CoordinatorError> {
        if self.state == LifecycleState::Active {
            Ok(())
        } else {
            Err(CoordinatorError::NotActive {
                operation,
                role: self.role,
                state: self.state,
            })
        }
    }

    /// Names are checked against every plugin created so far, not only the
    /// halves kept on this rank, so all ranks accept or reject alike.
    fn ensure_unique(&self, name: &str) -> Result<(), CoordinatorError> {
        if self.routed_names.contains(name) {
            return Err(CoordinatorError::InvalidArgument {
                plugin: name.to_string(),
                role: self.role,
                reason: format!("a plugin named '{name}' was already created"),
            });
        }
        Ok(())
    }

    fn reserve_tag(&mut self, name: &str) -> PluginTag {
        self.routed_names.insert(name.to_string());
        let tag = PluginTag(self.next_tag);
        self.next_tag += 1;
        tag
    }

    /// Consume a tag for a pair with no half on this rank.
    pub(crate) fn reserve_empty(&mut self, name: &str) -> Result<PluginTag, CoordinatorError> {
        self.ensure_active("route a plugin")?;
        self.ensure_unique(name)?;
        Ok(self.reserve_tag(name))
    }

    fn warn_if_late(&self, name: &str) {
        if self.step > StepIndex(0) {
            tracing::warn!(
                role = %self.role,
                plugin = %name,
                step = self.step.0,
                "plugin registered after stepping started"
            );
        }
    }

    // ── Registration ────────────────────────────────────────────

    /// Append a producer to the compute-side list.
    ///
    /// # Errors
    ///
    /// - [`CoordinatorError::NotActive`] outside the Active state.
    /// - [`CoordinatorError::RoleMismatch`] on a postprocess rank.
    /// - [`CoordinatorError::InvalidArgument`] if the name was already
    ///   created, on this rank or only on its peers.
    pub fn register_compute_plugin(
        &mut self,
        plugin: Box<dyn SimulationPlugin>,
    ) -> Result<Registration, CoordinatorError> {
        self.ensure_active("register a compute plugin")?;
        let name = plugin.name().to_string();
        if self.role != Role::Compute {
            return Err(CoordinatorError::RoleMismatch {
                plugin: name,
                role: self.role,
                half: Role::Compute,
            });
        }
        self.ensure_unique(&name)?;

        let tag = self.reserve_tag(&name);
        if !self.postprocess_enabled && plugin.needs_postprocess() {
            tracing::warn!(
                role = %self.role,
                plugin = %name,
                tag = tag.0,
                "no postprocess ranks, skipping producer"
            );
            return Ok(Registration::Skipped(tag));
        }
        self.warn_if_late(&name);
        tracing::info!(role = %self.role, plugin = %name, tag = tag.0, "plugin registered");
        self.compute_plugins
            .insert(name, Registered::new(tag, plugin));
        Ok(Registration::Registered(tag))
    }

    /// Append a consumer to the postprocess-side list.
    ///
    /// # Errors
    ///
    /// - [`CoordinatorError::NotActive`] outside the Active state.
    /// - [`CoordinatorError::RoleMismatch`] on a compute rank.
    /// - [`CoordinatorError::InvalidArgument`] if the name is taken.
    pub fn register_postprocess_plugin(
        &mut self,
        plugin: Box<dyn PostprocessPlugin>,
    ) -> Result<Registration, CoordinatorError> {
        self.ensure_active("register a postprocess plugin")?;
        let name = plugin.name().to_string();
        if self.role != Role::Postprocess {
            return Err(CoordinatorError::RoleMismatch {
                plugin: name,
                role: self.role,
                half: Role::Postprocess,
            });
        }
        self.ensure_unique(&name)?;

        let tag = self.reserve_tag(&name);
        self.warn_if_late(&name);
        tracing::info!(role = %self.role, plugin = %name, tag = tag.0, "plugin registered");
        self.postprocess_plugins
            .insert(name, Registered::new(tag, plugin));
        Ok(Registration::Registered(tag))
    }

    // ── Creation ────────────────────────────────────────────────

    /// Create the half of kind `K` that belongs on this rank.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::InvalidArgument`] if `name` is empty or was
    /// already created (whether or not its half lives on this rank), or
    /// the kind rejects `args`.
    pub fn create<K: PluginKind>(
        &self,
        name: &str,
        args: &K::Args,
    ) -> Result<PluginPair, CoordinatorError> {
        self.ensure_active("create a plugin")?;
        self.ensure_unique(name)?;
        create::<K>(self.role, name, args).map_err(|e| self.creation_failed(name, e))
    }

    /// Create a plugin from a configuration declaration.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::UnknownKind`] if `spec.kind` is not in
    /// `registry`; otherwise as [`create`](Self::create).
    pub fn create_from_spec(
        &self,
        registry: &PluginRegistry,
        spec: &PluginSpec,
    ) -> Result<PluginPair, CoordinatorError> {
        self.ensure_active("create a plugin")?;
        self.ensure_unique(&spec.name)?;
        match registry.build(self.role, spec) {
            Some(result) => result.map_err(|e| self.creation_failed(&spec.name, e)),
            None => Err(CoordinatorError::UnknownKind {
                kind: spec.kind.clone(),
                plugin: spec.name.clone(),
                role: self.role,
            }),
        }
    }

    fn creation_failed(&self, name: &str, e: PluginError) -> CoordinatorError {
        let reason = match e {
            PluginError::InvalidArgument { reason } => reason,
            other => other.to_string(),
        };
        CoordinatorError::InvalidArgument {
            plugin: name.to_string(),
            role: self.role,
            reason,
        }
    }

    /// Create a plugin of kind `K` and route it.
    pub fn add<K: PluginKind>(
        &mut self,
        name: &str,
        args: &K::Args,
    ) -> Result<RouteOutcome, CoordinatorError> {
        let pair = self.create::<K>(name, args)?;
        route(self, pair)
    }

    /// Create and route every declared plugin, in order.
    pub fn add_specs(
        &mut self,
        registry: &PluginRegistry,
        specs: &[PluginSpec],
    ) -> Result<Vec<RouteOutcome>, CoordinatorError> {
        specs
            .iter()
            .map(|spec| {
                let pair = self.create_from_spec(registry, spec)?;
                route(self, pair)
            })
            .collect()
    }

    /// Construct an engine object if this rank's role allows it.
    pub fn make<A, T>(&self, ctor: &GuardedConstructor<A, T>, args: A) -> Handle<T> {
        ctor.make(self.role, args)
    }

    // ── Hooks ───────────────────────────────────────────────────

    fn run_pending_setup(&mut self) -> Result<(), CoordinatorError> {
        let role = self.role;
        let step = self.step;
        for (name, reg) in self.compute_plugins.iter_mut().filter(|(_, r)| !r.set_up) {
            reg.plugin
                .setup(&SetupContext::new(reg.tag, role))
                .map_err(|e| plugin_failed(name, role, PluginHook::Setup, step, e))?;
            reg.set_up = true;
            tracing::debug!(role = %role, plugin = %name, "setup done");
        }
        for (name, reg) in self
            .postprocess_plugins
            .iter_mut()
            .filter(|(_, r)| !r.set_up)
        {
            reg.plugin
                .setup(&SetupContext::new(reg.tag, role))
                .map_err(|e| plugin_failed(name, role, PluginHook::Setup, step, e))?;
            reg.set_up = true;
            tracing::debug!(role = %role, plugin = %name, "setup done");
        }
        Ok(())
    }

    /// Run one step of every registered plugin, in registration order.
    ///
    /// Compute ranks pass the engine state after it has advanced;
    /// postprocess ranks pass `None`. Plugins not yet set up (all of them,
    /// on the first call) run their setup hook first.
    ///
    /// # Errors
    ///
    /// - [`CoordinatorError::NotActive`] outside the Active state.
    /// - [`CoordinatorError::PluginFailed`] for the first failing hook;
    ///   later plugins are not run and the step counter does not advance.
    pub fn step_all(
        &mut self,
        mut state: Option<&mut dyn SimulationState>,
    ) -> Result<StepMetrics, CoordinatorError> {
        self.ensure_active("step")?;
        let start = Instant::now();
        self.run_pending_setup()?;
        let setup_us = elapsed_us(start);

        let role = self.role;
        let step = self.step;
        let transport: &dyn Transport = &*self.transport;
        let mut plugin_us = Vec::new();

        match role {
            Role::Compute => {
                plugin_us.reserve(self.compute_plugins.len());
                for (name, reg) in self.compute_plugins.iter_mut() {
                    let t0 = Instant::now();
                    let mut ctx =
                        SimulationContext::new(step, reborrow(&mut state), transport, name);
                    reg.plugin
                        .step(&mut ctx)
                        .map_err(|e| plugin_failed(name, role, PluginHook::Step, step, e))?;
                    plugin_us.push((name.clone(), elapsed_us(t0)));
                }
            }
            Role::Postprocess => {
                plugin_us.reserve(self.postprocess_plugins.len());
                for (name, reg) in self.postprocess_plugins.iter_mut() {
                    let t0 = Instant::now();
                    let mut ctx = PostprocessContext::new(step, transport, name);
                    reg.plugin
                        .step(&mut ctx)
                        .map_err(|e| plugin_failed(name, role, PluginHook::Step, step, e))?;
                    plugin_us.push((name.clone(), elapsed_us(t0)));
                }
            }
        }

        self.step = step.next();
        Ok(StepMetrics {
            step,
            total_us: elapsed_us(start),
            setup_us,
            plugin_us,
        })
    }

    /// Run every plugin's checkpoint hook, in registration order.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::NotActive`] outside the Active state;
    /// [`CoordinatorError::PluginFailed`] for the first failing hook.
    pub fn checkpoint(&mut self, folder: &Path, id: u64) -> Result<(), CoordinatorError> {
        self.ensure_active("checkpoint")?;
        let role = self.role;
        let step = self.step;
        for (name, reg) in self.compute_plugins.iter_mut() {
            reg.plugin
                .checkpoint(folder, id)
                .map_err(|e| plugin_failed(name, role, PluginHook::Checkpoint, step, e))?;
        }
        for (name, reg) in self.postprocess_plugins.iter_mut() {
            reg.plugin
                .checkpoint(folder, id)
                .map_err(|e| plugin_failed(name, role, PluginHook::Checkpoint, step, e))?;
        }
        tracing::info!(role = %role, id, folder = %folder.display(), "checkpoint written");
        Ok(())
    }

    /// Run every plugin's finalize hook in registration order, then move
    /// to Finalized and release the activation slot.
    ///
    /// Every hook runs even if an earlier one fails; the state becomes
    /// Finalized regardless.
    ///
    /// Plugins that never stepped get `finalize` without `setup`.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::NotActive`] if not Active;
    /// [`CoordinatorError::PluginFailed`] for the first failing hook.
    pub fn finalize(&mut self) -> Result<(), CoordinatorError> {
        self.ensure_active("finalize")?;
        let role = self.role;
        let step = self.step;
        let mut first_error = None;

        for (name, reg) in self.compute_plugins.iter_mut() {
            if let Err(e) = reg.plugin.finalize() {
                let err = plugin_failed(name, role, PluginHook::Finalize, step, e);
                first_error.get_or_insert(err);
            }
        }
        for (name, reg) in self.postprocess_plugins.iter_mut() {
            if let Err(e) = reg.plugin.finalize() {
                let err = plugin_failed(name, role, PluginHook::Finalize, step, e);
                first_error.get_or_insert(err);
            }
        }

        self.state = LifecycleState::Finalized;
        self.slot.release();
        tracing::info!(role = %role, steps = step.0, "coordinator finalized");
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if self.state == LifecycleState::Active {
            tracing::warn!(role = %self.role, "coordinator dropped without finalize");
            self.slot.release();
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("step", &self.step)
            .field("compute_plugins", &self.compute_plugin_names())
            .field("postprocess_plugins", &self.postprocess_plugin_names())
            .finish_non_exhaustive()
    }
}
