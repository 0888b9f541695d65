//! H. Procedure Scheduler — `run`/`spawn`/`status`/`wait`/`wait_all`/`result`,
//! the invocation tree, and cooperative cancellation.
//!
//! Generalizes `neuron-orch-kit`'s `OrchestratedRunner` (dispatch one agent,
//! interpret its effects, follow up) one layer up: instead of a single
//! dispatch-and-interpret call, a [`Scheduler`] runs whole procedure bodies —
//! scripted control flow that itself calls agents, tools, HITL, and
//! sub-procedures — as tracked, cancellable, awaitable invocations.
//!
//! What a "procedure body" *is* (a compiled script driven by `tactus-script`,
//! a Rust closure in a test, a demo's hand-written control flow) is opaque to
//! this crate: [`ProcedureBody`] is the seam. The scheduler's job is the
//! bookkeeping around running one: assigning an [`InvocationId`], tracking
//! parent/child relationships, recording status transitions through a
//! [`StorageBackend`], propagating cancellation down the child tree, and
//! exposing `wait`/`wait_all`/`result` so a parent can block on children the
//! same way `Procedure.wait` does in a script.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use tactus_core::error::TactusError;
use tactus_core::event::EventKind;
use tactus_core::invocation::{Invocation, InvocationStatus, SuspendReason};
use tactus_core::id::InvocationId;
use tactus_core::storage::StorageBackend;

/// Errors specific to scheduling, beyond the shared [`TactusError`] taxonomy
/// a procedure body itself may raise.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No procedure is registered under this name.
    #[error("procedure not found: {0}")]
    ProcedureNotFound(String),

    /// No invocation exists with this id.
    #[error("invocation not found: {0}")]
    InvocationNotFound(InvocationId),

    /// `resume` was called against an invocation that already reached a
    /// terminal status — nothing left to resume.
    #[error("invocation already terminal: {0}")]
    AlreadyTerminal(InvocationId),

    /// Dispatching this procedure would create a cycle in the call graph
    /// (it appears in its own ancestor chain).
    #[error("cyclic sub-procedure call: {0} calls itself transitively")]
    CyclicCall(String),

    /// A durable storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] tactus_core::error::StateError),
}

impl From<SchedulerError> for TactusError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::CyclicCall(name) => {
                TactusError::Internal(format!("cyclic sub-procedure call: {name}"))
            }
            other => TactusError::Internal(other.to_string()),
        }
    }
}

/// A procedure body: whatever actually runs inside one invocation.
///
/// Implementations receive an [`InvocationHandle`] bound to their own
/// invocation — never a process-wide singleton — so parallel invocations of
/// the same procedure (as the BDD harness's `evaluate` runs many times)
/// never share mutable state by accident.
#[async_trait]
pub trait ProcedureBody: Send + Sync {
    /// Run to completion (or to a script-visible error), returning the
    /// invocation's result value.
    async fn run(&self, ctx: InvocationHandle) -> Result<serde_json::Value, TactusError>;
}

/// Blanket impl so a plain async closure can stand in for a procedure body —
/// useful in tests and in small demos that don't go through `tactus-script`.
#[async_trait]
impl<F, Fut> ProcedureBody for F
where
    F: Fn(InvocationHandle) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<serde_json::Value, TactusError>> + Send,
{
    async fn run(&self, ctx: InvocationHandle) -> Result<serde_json::Value, TactusError> {
        (self)(ctx).await
    }
}

/// What a running or finished invocation looks like from the outside.
#[derive(Debug, Clone)]
pub struct ProcedureStatus {
    /// Current lifecycle status.
    pub status: InvocationStatus,
    /// Number of agent turns taken so far (`Iterations.current`).
    pub iterations: u32,
    /// Ids of children spawned so far.
    pub children: Vec<InvocationId>,
}

/// A handle to one running invocation, given to its [`ProcedureBody`].
///
/// This is the primitive surface a script bridge binds `Procedure`,
/// `Iterations`, and child-spawn operations to — scoped to exactly one
/// invocation, per the "never a process-wide singleton" design note.
#[derive(Clone)]
pub struct InvocationHandle {
    /// This invocation's id.
    pub id: InvocationId,
    /// The parent invocation, if this is a child.
    pub parent: Option<InvocationId>,
    /// Resolved parameters passed to this invocation.
    pub params: serde_json::Value,
    scheduler: Scheduler,
    iterations: Arc<AtomicU32>,
    cancelled: Arc<AtomicBool>,
    call_stack: Arc<Vec<String>>,
}

impl InvocationHandle {
    /// Spawn a child invocation asynchronously and return immediately.
    pub async fn spawn(
        &self,
        procedure: &str,
        params: serde_json::Value,
    ) -> Result<InvocationId, SchedulerError> {
        self.scheduler
            .spawn_with_stack(procedure, params, Some(self.id.clone()), self.call_stack.as_ref())
            .await
    }

    /// Spawn a child and block until it terminates (`Procedure.run`).
    pub async fn run_child(
        &self,
        procedure: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TactusError> {
        let child = self.spawn(procedure, params).await?;
        self.scheduler.result(&child).await
    }

    /// Block until the given invocation is terminal or the timeout elapses.
    /// `None` timeout waits indefinitely. Returns `None` on timeout — the
    /// "null sentinel" `Procedure.wait` returns per §5.
    pub async fn wait(
        &self,
        child: &InvocationId,
        timeout: Option<std::time::Duration>,
    ) -> Result<Option<Result<serde_json::Value, TactusError>>, SchedulerError> {
        self.scheduler.wait(child, timeout).await
    }

    /// Block until every handle in `children` is terminal.
    pub async fn wait_all(&self, children: &[InvocationId]) -> Result<(), SchedulerError> {
        self.scheduler.wait_all(children).await
    }

    /// Re-raise a child's failure, or return its result.
    pub async fn result(&self, child: &InvocationId) -> Result<serde_json::Value, TactusError> {
        self.scheduler.result(child).await
    }

    /// Query a handle's current status without blocking.
    pub async fn status(&self, child: &InvocationId) -> Result<ProcedureStatus, SchedulerError> {
        self.scheduler.status(child).await
    }

    /// Record one agent turn against this invocation's iteration counter.
    /// Called by the agent primitive (via the script bridge) after each
    /// `turn()`, not by procedure bodies directly.
    pub fn record_turn(&self) -> u32 {
        self.iterations.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// `Iterations.current`.
    pub fn iterations(&self) -> u32 {
        self.iterations.load(Ordering::SeqCst)
    }

    /// `Iterations.exceeded(n)`.
    pub fn iterations_exceeded(&self, n: u32) -> bool {
        self.iterations() > n
    }

    /// Whether this invocation has been cooperatively cancelled. Primitives
    /// check this at every suspension point and raise `Cancelled` if true.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Raise `Cancelled` if this invocation has been cancelled. Call at
    /// every suspension point (agent turn, tool call, HITL, wait, Step.run
    /// I/O) per §5.
    pub fn check_cancelled(&self) -> Result<(), TactusError> {
        if self.is_cancelled() {
            Err(TactusError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Append an event to this invocation's log through the scheduler's
    /// storage backend.
    pub async fn emit(&self, kind: EventKind) -> Result<(), SchedulerError> {
        self.scheduler.emit(&self.id, kind).await
    }

    /// Access the durable checkpoint journal / event log / invocation
    /// record backend this invocation is running against.
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.scheduler.storage
    }
}

struct RunningInvocation {
    join: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
    iterations: Arc<AtomicU32>,
    result_rx: watch::Receiver<Option<Result<serde_json::Value, TactusError>>>,
    children: Arc<RwLock<Vec<InvocationId>>>,
}

struct Inner {
    storage: Arc<dyn StorageBackend>,
    procedures: RwLock<HashMap<String, Arc<dyn ProcedureBody>>>,
    running: RwLock<HashMap<InvocationId, RunningInvocation>>,
    next_id: std::sync::atomic::AtomicU64,
}

/// Owns execution: runs registered procedures as tracked invocations,
/// bounded to one process (§5 — cooperative scheduling, parallelism is
/// between invocations, never within one).
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
    storage: Arc<dyn StorageBackend>,
}

impl Scheduler {
    /// Create a scheduler backed by the given durable storage.
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let inner = Arc::new(Inner {
            storage: Arc::clone(&storage),
            procedures: RwLock::new(HashMap::new()),
            running: RwLock::new(HashMap::new()),
            next_id: std::sync::atomic::AtomicU64::new(1),
        });
        Self { inner, storage }
    }

    /// Register a named procedure body, making it spawnable/runnable.
    pub async fn register(&self, name: impl Into<String>, body: Arc<dyn ProcedureBody>) {
        self.inner.procedures.write().await.insert(name.into(), body);
    }

    fn fresh_id(&self, procedure: &str) -> InvocationId {
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        InvocationId::new(format!("{procedure}-{n}"))
    }

    async fn emit(&self, id: &InvocationId, kind: EventKind) -> Result<(), SchedulerError> {
        let now = now_ms();
        self.storage.append_event(id, kind, now).await?;
        Ok(())
    }

    /// Spawn a new top-level invocation of `procedure`.
    pub async fn spawn(
        &self,
        procedure: &str,
        params: serde_json::Value,
    ) -> Result<InvocationId, SchedulerError> {
        self.spawn_with_stack(procedure, params, None, &[]).await
    }

    /// Spawn + wait: `Procedure.run`.
    pub async fn run(
        &self,
        procedure: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TactusError> {
        let id = self.spawn(procedure, params).await?;
        self.result(&id).await
    }

    async fn spawn_with_stack(
        &self,
        procedure: &str,
        params: serde_json::Value,
        parent: Option<InvocationId>,
        parent_stack: &[String],
    ) -> Result<InvocationId, SchedulerError> {
        if parent_stack.iter().any(|name| name == procedure) {
            return Err(SchedulerError::CyclicCall(procedure.to_string()));
        }

        let body = {
            let procedures = self.inner.procedures.read().await;
            procedures
                .get(procedure)
                .cloned()
                .ok_or_else(|| SchedulerError::ProcedureNotFound(procedure.to_string()))?
        };

        let id = self.fresh_id(procedure);
        let now = now_ms();
        let mut invocation = Invocation::new(id.clone(), procedure, now).with_params(params.clone());
        invocation.parent = parent.clone();
        self.storage.save_invocation(&invocation).await?;
        self.emit(&id, EventKind::TurnStarted { agent: procedure.to_string() })
            .await?;

        if let Some(parent_id) = &parent {
            if let Some(running) = self.inner.running.read().await.get(parent_id) {
                running.children.write().await.push(id.clone());
            }
            self.emit(parent_id, EventKind::ChildSpawned { child: id.clone() })
                .await?;
        }

        let mut call_stack = parent_stack.to_vec();
        call_stack.push(procedure.to_string());

        let cancelled = Arc::new(AtomicBool::new(false));
        let iterations = Arc::new(AtomicU32::new(0));
        let children = Arc::new(RwLock::new(Vec::new()));

        let handle = InvocationHandle {
            id: id.clone(),
            parent: parent.clone(),
            params,
            scheduler: self.clone(),
            iterations: Arc::clone(&iterations),
            cancelled: Arc::clone(&cancelled),
            call_stack: Arc::new(call_stack),
        };

        self.track(id.clone(), handle, body, cancelled, iterations, children)
            .await;

        Ok(id)
    }

    /// Spawn the background task driving one invocation and register it as
    /// running — the tail shared by a fresh `spawn` and a `resume` of an
    /// existing invocation id.
    async fn track(
        &self,
        id: InvocationId,
        handle: InvocationHandle,
        body: Arc<dyn ProcedureBody>,
        cancelled: Arc<AtomicBool>,
        iterations: Arc<AtomicU32>,
        children: Arc<RwLock<Vec<InvocationId>>>,
    ) {
        let (result_tx, result_rx) = watch::channel(None);
        let storage = Arc::clone(&self.storage);
        let inv_id = id.clone();
        let join = tokio::spawn(async move {
            let outcome = body.run(handle).await;
            let now = now_ms();
            let status = match &outcome {
                Ok(_) => InvocationStatus::Completed,
                Err(TactusError::Cancelled) => InvocationStatus::Cancelled,
                Err(e) => InvocationStatus::Failed { reason: e.to_string() },
            };
            if let Ok(Some(mut invocation)) = storage.load_invocation(&inv_id).await {
                invocation.status = status;
                invocation.updated_at_ms = now;
                let _ = storage.save_invocation(&invocation).await;
            }
            let exit_reason = match &outcome {
                Ok(_) => "complete".to_string(),
                Err(e) => format!("{e}"),
            };
            let _ = storage
                .append_event(
                    &inv_id,
                    EventKind::TurnCompleted {
                        agent: String::new(),
                        exit_reason,
                    },
                    now,
                )
                .await;
            let _ = result_tx.send(Some(outcome));
        });

        self.inner.running.write().await.insert(
            id,
            RunningInvocation {
                join,
                cancelled,
                iterations,
                result_rx,
                children,
            },
        );
    }

    /// Reconstruct a previously-stored invocation under its existing id and
    /// resume its procedure body (§5 Resume). Every primitive call whose
    /// step_id was already journalled (`Step.run`, `Human.*`, `Agent.turn`)
    /// replays its recorded value straight off the checkpoint journal
    /// instead of re-running, per the read-through contract those
    /// primitives already honor — so only the first un-journalled
    /// suspension point does new work. Errors if no such invocation was
    /// ever saved, its procedure definition isn't registered under this
    /// scheduler, or it already reached a terminal status.
    pub async fn resume(&self, id: &InvocationId) -> Result<InvocationId, SchedulerError> {
        let mut invocation = self
            .storage
            .load_invocation(id)
            .await?
            .ok_or_else(|| SchedulerError::InvocationNotFound(id.clone()))?;

        if invocation.is_terminal() {
            return Err(SchedulerError::AlreadyTerminal(id.clone()));
        }

        let body = {
            let procedures = self.inner.procedures.read().await;
            procedures
                .get(invocation.procedure.as_str())
                .cloned()
                .ok_or_else(|| SchedulerError::ProcedureNotFound(invocation.procedure.clone()))?
        };

        invocation.status = InvocationStatus::Running;
        invocation.updated_at_ms = now_ms();
        self.storage.save_invocation(&invocation).await?;
        self.emit(
            id,
            EventKind::Custom {
                event_type: "resumed".to_string(),
                data: serde_json::Value::Null,
            },
        )
        .await?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let iterations = Arc::new(AtomicU32::new(0));
        let children = Arc::new(RwLock::new(Vec::new()));

        let handle = InvocationHandle {
            id: id.clone(),
            parent: invocation.parent.clone(),
            params: invocation.params.clone(),
            scheduler: self.clone(),
            iterations: Arc::clone(&iterations),
            cancelled: Arc::clone(&cancelled),
            call_stack: Arc::new(vec![invocation.procedure.clone()]),
        };

        self.track(id.clone(), handle, body, cancelled, iterations, children)
            .await;

        Ok(id.clone())
    }

    /// Non-blocking status query.
    pub async fn status(&self, id: &InvocationId) -> Result<ProcedureStatus, SchedulerError> {
        let invocation = self
            .storage
            .load_invocation(id)
            .await?
            .ok_or_else(|| SchedulerError::InvocationNotFound(id.clone()))?;

        let running = self.inner.running.read().await;
        let (iterations, children) = match running.get(id) {
            Some(r) => (
                r.iterations.load(Ordering::SeqCst),
                r.children.read().await.clone(),
            ),
            None => (0, Vec::new()),
        };

        Ok(ProcedureStatus {
            status: invocation.status,
            iterations,
            children,
        })
    }

    /// Block until `id` is terminal or `timeout` elapses. `None` timeout
    /// waits indefinitely. Returns `Ok(None)` on timeout.
    pub async fn wait(
        &self,
        id: &InvocationId,
        timeout: Option<std::time::Duration>,
    ) -> Result<Option<Result<serde_json::Value, TactusError>>, SchedulerError> {
        let mut rx = {
            let running = self.inner.running.read().await;
            let entry = running
                .get(id)
                .ok_or_else(|| SchedulerError::InvocationNotFound(id.clone()))?;
            entry.result_rx.clone()
        };

        let wait_for_value = async {
            loop {
                if let Some(v) = rx.borrow().clone() {
                    return v;
                }
                if rx.changed().await.is_err() {
                    return match rx.borrow().clone() {
                        Some(v) => v,
                        None => Err(TactusError::Internal("invocation task dropped".into())),
                    };
                }
            }
        };

        match timeout {
            None => Ok(Some(wait_for_value.await)),
            Some(d) => match tokio::time::timeout(d, wait_for_value).await {
                Ok(v) => Ok(Some(v)),
                Err(_) => Ok(None),
            },
        }
    }

    /// Block until every handle in `ids` is terminal.
    pub async fn wait_all(&self, ids: &[InvocationId]) -> Result<(), SchedulerError> {
        for id in ids {
            self.wait(id, None).await?;
        }
        Ok(())
    }

    /// Return the terminal result, or re-raise the invocation's failure.
    pub async fn result(&self, id: &InvocationId) -> Result<serde_json::Value, TactusError> {
        match self.wait(id, None).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => unreachable!("wait with no timeout never returns None"),
            Err(e) => Err(e.into()),
        }
    }

    /// Cancel an invocation and propagate cancellation down its live
    /// children, cooperatively: the flag is checked at each suspension
    /// point, it is not a forced task abort.
    pub async fn cancel(&self, id: &InvocationId) -> Result<(), SchedulerError> {
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let running = self.inner.running.read().await;
            if let Some(entry) = running.get(&current) {
                entry.cancelled.store(true, Ordering::SeqCst);
                let children = entry.children.read().await.clone();
                drop(running);
                stack.extend(children);
            }
        }

        if let Some(mut invocation) = self.storage.load_invocation(id).await? {
            if !invocation.status.is_terminal() {
                invocation.status = InvocationStatus::Suspended {
                    reason: SuspendReason::AwaitingSignal {
                        signal_type: "cancel".into(),
                    },
                };
                invocation.updated_at_ms = now_ms();
                self.storage.save_invocation(&invocation).await?;
            }
        }

        Ok(())
    }

    /// Join the background task driving an invocation, if still running.
    /// Mostly useful in tests that want a deterministic shutdown.
    pub async fn join(&self, id: &InvocationId) {
        let join = {
            let mut running = self.inner.running.write().await;
            running.remove(id).map(|r| r.join)
        };
        if let Some(join) = join {
            let _ = join.await;
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tactus_state_memory_for_tests::MemoryStore;

    // tactus-scheduler's Cargo.toml doesn't depend on tactus-state-memory
    // (state backends are a separate concern from scheduling); tests here
    // use a tiny local re-implementation of the pieces MemoryStore already
    // proves elsewhere, to avoid a dev-dependency cycle across the crate
    // graph. See `support` module below.
    mod tactus_state_memory_for_tests {
        pub use crate::procedure::tests::support::MemoryStore;
    }

    pub(crate) mod support {
        use async_trait::async_trait;
        use std::collections::HashMap;
        use tactus_core::effect::Scope;
        use tactus_core::error::StateError;
        use tactus_core::event::{Event, EventKind};
        use tactus_core::id::InvocationId;
        use tactus_core::invocation::Invocation;
        use tactus_core::state::{SearchResult, StateStore};
        use tactus_core::storage::StorageBackend;
        use tokio::sync::RwLock;

        #[derive(Default)]
        pub struct MemoryStore {
            invocations: RwLock<HashMap<InvocationId, Invocation>>,
            events: RwLock<HashMap<InvocationId, Vec<Event>>>,
            checkpoints: RwLock<HashMap<InvocationId, HashMap<String, serde_json::Value>>>,
        }

        impl MemoryStore {
            pub fn new() -> Self {
                Self::default()
            }
        }

        #[async_trait]
        impl StateStore for MemoryStore {
            async fn read(&self, _s: &Scope, _k: &str) -> Result<Option<serde_json::Value>, StateError> {
                Ok(None)
            }
            async fn write(&self, _s: &Scope, _k: &str, _v: serde_json::Value) -> Result<(), StateError> {
                Ok(())
            }
            async fn delete(&self, _s: &Scope, _k: &str) -> Result<(), StateError> {
                Ok(())
            }
            async fn list(&self, _s: &Scope, _p: &str) -> Result<Vec<String>, StateError> {
                Ok(vec![])
            }
            async fn search(
                &self,
                _s: &Scope,
                _q: &str,
                _l: usize,
            ) -> Result<Vec<SearchResult>, StateError> {
                Ok(vec![])
            }
        }

        #[async_trait]
        impl StorageBackend for MemoryStore {
            async fn save_invocation(&self, invocation: &Invocation) -> Result<(), StateError> {
                self.invocations
                    .write()
                    .await
                    .insert(invocation.id.clone(), invocation.clone());
                Ok(())
            }
            async fn load_invocation(
                &self,
                id: &InvocationId,
            ) -> Result<Option<Invocation>, StateError> {
                Ok(self.invocations.read().await.get(id).cloned())
            }
            async fn list_invocations(&self) -> Result<Vec<Invocation>, StateError> {
                Ok(self.invocations.read().await.values().cloned().collect())
            }
            async fn delete_invocation(&self, id: &InvocationId) -> Result<(), StateError> {
                self.invocations.write().await.remove(id);
                self.events.write().await.remove(id);
                self.checkpoints.write().await.remove(id);
                Ok(())
            }
            async fn append_event(
                &self,
                invocation: &InvocationId,
                kind: EventKind,
                timestamp_ms: u64,
            ) -> Result<Event, StateError> {
                let mut events = self.events.write().await;
                let log = events.entry(invocation.clone()).or_default();
                let seq = log.len() as u64 + 1;
                let event = Event {
                    invocation: invocation.clone(),
                    seq,
                    timestamp_ms,
                    kind,
                };
                log.push(event.clone());
                Ok(event)
            }
            async fn read_events(
                &self,
                invocation: &InvocationId,
                since_seq: u64,
            ) -> Result<Vec<Event>, StateError> {
                Ok(self
                    .events
                    .read()
                    .await
                    .get(invocation)
                    .map(|log| log.iter().filter(|e| e.seq > since_seq).cloned().collect())
                    .unwrap_or_default())
            }
            async fn write_checkpoint(
                &self,
                invocation: &InvocationId,
                step_id: &str,
                value: serde_json::Value,
            ) -> Result<(), StateError> {
                self.checkpoints
                    .write()
                    .await
                    .entry(invocation.clone())
                    .or_default()
                    .insert(step_id.to_string(), value);
                Ok(())
            }
            async fn read_checkpoint(
                &self,
                invocation: &InvocationId,
                step_id: &str,
            ) -> Result<Option<serde_json::Value>, StateError> {
                Ok(self
                    .checkpoints
                    .read()
                    .await
                    .get(invocation)
                    .and_then(|m| m.get(step_id).cloned()))
            }
        }
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn run_completes_and_returns_result() {
        let sched = scheduler();
        sched
            .register(
                "greeter",
                Arc::new(|ctx: InvocationHandle| async move { Ok(json!({ "greeted": ctx.params })) }),
            )
            .await;

        let result = sched.run("greeter", json!("World")).await.unwrap();
        assert_eq!(result, json!({ "greeted": "World" }));
    }

    #[tokio::test]
    async fn spawn_then_wait_returns_same_result_as_run() {
        let sched = scheduler();
        sched
            .register("echo", Arc::new(|ctx: InvocationHandle| async move { Ok(ctx.params) }))
            .await;

        let id = sched.spawn("echo", json!(42)).await.unwrap();
        let result = sched.wait(&id, None).await.unwrap().unwrap().unwrap();
        assert_eq!(result, json!(42));
    }

    #[tokio::test]
    async fn wait_with_zero_timeout_on_nonterminal_returns_none() {
        let sched = scheduler();
        sched
            .register(
                "slow",
                Arc::new(|_ctx: InvocationHandle| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    Ok(json!(null))
                }),
            )
            .await;

        let id = sched.spawn("slow", json!(null)).await.unwrap();
        let result = sched
            .wait(&id, Some(std::time::Duration::from_millis(0)))
            .await
            .unwrap();
        assert!(result.is_none());

        // Drain so the test doesn't leak a background task warning.
        sched.wait(&id, None).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_procedure_errors() {
        let sched = scheduler();
        let err = sched.spawn("nope", json!(null)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ProcedureNotFound(_)));
    }

    #[tokio::test]
    async fn failing_body_surfaces_error_from_result() {
        let sched = scheduler();
        sched
            .register(
                "boom",
                Arc::new(|_ctx: InvocationHandle| async move {
                    Err(TactusError::Validation("bad input".into()))
                }),
            )
            .await;

        let err = sched.run("boom", json!(null)).await.unwrap_err();
        assert!(matches!(err, TactusError::Validation(_)));
    }

    #[tokio::test]
    async fn parent_spawns_children_and_wait_all_blocks_until_both_done() {
        let sched = scheduler();
        sched
            .register("child", Arc::new(|ctx: InvocationHandle| async move { Ok(ctx.params) }))
            .await;
        sched
            .register(
                "parent",
                Arc::new(|ctx: InvocationHandle| async move {
                    let a = ctx.spawn("child", json!(1)).await.unwrap();
                    let b = ctx.spawn("child", json!(2)).await.unwrap();
                    ctx.wait_all(&[a.clone(), b.clone()]).await.unwrap();
                    let ra = ctx.result(&a).await.unwrap();
                    let rb = ctx.result(&b).await.unwrap();
                    Ok(json!(ra.as_i64().unwrap() + rb.as_i64().unwrap()))
                }),
            )
            .await;

        let result = sched.run("parent", json!(null)).await.unwrap();
        assert_eq!(result, json!(3));
    }

    #[tokio::test]
    async fn cancel_propagates_to_children() {
        let sched = scheduler();
        sched
            .register(
                "leaf",
                Arc::new(|ctx: InvocationHandle| async move {
                    loop {
                        if ctx.is_cancelled() {
                            return Err(TactusError::Cancelled);
                        }
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    }
                }),
            )
            .await;
        sched
            .register(
                "root",
                Arc::new(|ctx: InvocationHandle| async move {
                    let leaf = ctx.spawn("leaf", json!(null)).await.unwrap();
                    loop {
                        ctx.check_cancelled()?;
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        let _ = &leaf;
                    }
                }),
            )
            .await;

        let root = sched.spawn("root", json!(null)).await.unwrap();
        // Let both tasks start.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        sched.cancel(&root).await.unwrap();

        let outcome = sched.wait(&root, None).await.unwrap().unwrap();
        assert!(matches!(outcome, Err(TactusError::Cancelled)));
    }

    #[tokio::test]
    async fn cyclic_sub_procedure_call_is_rejected() {
        let sched = scheduler();
        sched
            .register(
                "recur",
                Arc::new(|ctx: InvocationHandle| async move {
                    match ctx.spawn("recur", json!(null)).await {
                        Err(SchedulerError::CyclicCall(name)) => {
                            assert_eq!(name, "recur");
                            Ok(json!("caught"))
                        }
                        other => panic!("expected CyclicCall, got {other:?}"),
                    }
                }),
            )
            .await;

        let result = sched.run("recur", json!(null)).await.unwrap();
        assert_eq!(result, json!("caught"));
    }

    #[tokio::test]
    async fn iteration_counter_tracks_record_turn_calls() {
        let sched = scheduler();
        sched
            .register(
                "counts",
                Arc::new(|ctx: InvocationHandle| async move {
                    ctx.record_turn();
                    ctx.record_turn();
                    assert_eq!(ctx.iterations(), 2);
                    assert!(ctx.iterations_exceeded(1));
                    assert!(!ctx.iterations_exceeded(2));
                    Ok(json!(null))
                }),
            )
            .await;

        sched.run("counts", json!(null)).await.unwrap();
    }

    #[tokio::test]
    async fn resume_replays_checkpointed_step_without_rerunning_it() {
        let store = Arc::new(support::MemoryStore::new());
        let sched = Scheduler::new(Arc::clone(&store) as Arc<dyn StorageBackend>);

        let side_effects = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        {
            let side_effects = Arc::clone(&side_effects);
            sched
                .register(
                    "resumable",
                    Arc::new(move |ctx: InvocationHandle| {
                        let side_effects = Arc::clone(&side_effects);
                        async move {
                            let storage = ctx.storage();
                            if let Some(v) = storage
                                .read_checkpoint(&ctx.id, "counter")
                                .await
                                .map_err(TactusError::from)?
                            {
                                return Ok(v);
                            }
                            side_effects.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                            let value = json!({ "n": 1 });
                            storage
                                .write_checkpoint(&ctx.id, "counter", value.clone())
                                .await
                                .map_err(TactusError::from)?;
                            Ok(value)
                        }
                    }),
                )
                .await;
        }

        let id = InvocationId::new("resumable-resume-test");
        let invocation = Invocation::new(id.clone(), "resumable", 0).with_params(json!(null));
        store.save_invocation(&invocation).await.unwrap();
        store
            .write_checkpoint(&id, "counter", json!({ "n": 1 }))
            .await
            .unwrap();

        let resumed_id = sched.resume(&id).await.unwrap();
        assert_eq!(resumed_id, id);

        let result = sched.result(&id).await.unwrap();
        assert_eq!(result, json!({ "n": 1 }));
        assert_eq!(side_effects.load(std::sync::atomic::Ordering::SeqCst), 0);

        let status = sched.status(&id).await.unwrap();
        assert_eq!(status.status, InvocationStatus::Completed);
    }

    #[tokio::test]
    async fn resume_of_terminal_invocation_errors() {
        let sched = scheduler();
        sched
            .register("done", Arc::new(|_ctx: InvocationHandle| async move { Ok(json!(null)) }))
            .await;

        let id = sched.spawn("done", json!(null)).await.unwrap();
        sched.wait(&id, None).await.unwrap();

        let err = sched.resume(&id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyTerminal(_)));
    }

    #[tokio::test]
    async fn resume_of_unknown_invocation_errors() {
        let sched = scheduler();
        let id = InvocationId::new("never-existed");
        let err = sched.resume(&id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvocationNotFound(_)));
    }
}
