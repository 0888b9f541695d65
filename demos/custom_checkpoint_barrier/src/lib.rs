//! Worked example: a hand-written [`ProcedureBody`] that checkpoints a
//! manual barrier step without going through `tactus-script`'s `Step.run`
//! at all — for an embedder that drives the scheduler directly from Rust
//! instead of through a scripted procedure.
//!
//! [`checkpointed_step`] is the same read-through pattern `Step.run` and
//! `HitlGateway::request` both use internally: check the journal first,
//! run the effect only on a miss, record the result before anyone can
//! observe it. [`BarrierBody`] uses it to run a fixed set of named tasks
//! through a tool, each independently checkpointed, so that resuming a
//! partially-completed invocation replays every already-finished task's
//! result instead of re-invoking the tool for it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use tactus_core::error::TactusError;
use tactus_core::event::EventKind;
use tactus_scheduler::procedure::{InvocationHandle, ProcedureBody};
use tactus_tool::ToolDyn;

/// Run `step_id` through the checkpoint-journal read-through pattern: a
/// hit replays its recorded value and skips `effect` entirely; a miss
/// runs `effect`, persists its result, and only then returns it.
///
/// Mirrors `Step.run`'s own "check journal, else run and record" body in
/// `tactus-script::capabilities`, just called directly against a
/// [`ProcedureBody`]'s [`InvocationHandle`] instead of through a script.
pub async fn checkpointed_step<F, Fut>(
    ctx: &InvocationHandle,
    step_id: &str,
    effect: F,
) -> Result<Value, TactusError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Value, TactusError>>,
{
    ctx.check_cancelled()?;

    if let Some(value) = ctx
        .storage()
        .read_checkpoint(&ctx.id, step_id)
        .await
        .map_err(TactusError::from)?
    {
        ctx.emit(EventKind::CheckpointHit {
            step_id: step_id.to_string(),
        })
        .await
        .map_err(TactusError::from)?;
        return Ok(value);
    }

    ctx.emit(EventKind::CheckpointMiss {
        step_id: step_id.to_string(),
    })
    .await
    .map_err(TactusError::from)?;

    let value = effect().await?;

    ctx.storage()
        .write_checkpoint(&ctx.id, step_id, value.clone())
        .await
        .map_err(TactusError::from)?;

    Ok(value)
}

/// A procedure body that runs a fixed list of named tasks through one
/// tool, each as its own checkpointed step, then combines their results
/// once every task has one — the barrier. A task whose checkpoint
/// already exists (because this invocation is resuming after a crash, a
/// cancellation, or a prior partial run) never calls the tool again.
pub struct BarrierBody {
    /// Task names, run in order. Each becomes its own checkpointed step
    /// keyed `barrier:{task}`.
    pub tasks: Vec<String>,
    /// The tool every task invokes, given `{"task": name}` as input.
    pub tool: Arc<dyn ToolDyn>,
}

impl BarrierBody {
    /// Build a barrier over `tasks`, all driven through `tool`.
    pub fn new(tasks: Vec<String>, tool: Arc<dyn ToolDyn>) -> Self {
        Self { tasks, tool }
    }
}

#[async_trait]
impl ProcedureBody for BarrierBody {
    async fn run(&self, ctx: InvocationHandle) -> Result<Value, TactusError> {
        let mut results = Vec::with_capacity(self.tasks.len());

        for task in &self.tasks {
            let step_id = format!("barrier:{task}");
            let tool = Arc::clone(&self.tool);
            let input = json!({ "task": task });
            let value = checkpointed_step(&ctx, &step_id, move || async move {
                tool.call(input)
                    .await
                    .map_err(|e| TactusError::Tool(e.to_string()))
            })
            .await?;
            results.push(value);
        }

        // The barrier itself: nothing past this point runs until every
        // task above has a checkpointed result, whether this is the run
        // that produced them or a resume that replayed them.
        let total_charged: f64 = results
            .iter()
            .filter_map(|v| v.get("charged").and_then(Value::as_f64))
            .sum();

        Ok(json!({
            "tasks_completed": self.tasks.len(),
            "total_charged": total_charged,
        }))
    }
}
