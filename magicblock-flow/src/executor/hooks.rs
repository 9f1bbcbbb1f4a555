use async_trait::async_trait;

use crate::{
    context::StepResult,
    executor::{FlowExecutorError, UnitState},
    planner::ExecutionUnit,
};

/// Observer of flow progress. Execution waits for every hook to return.
#[async_trait]
pub trait FlowHooks: Send + Sync {
    /// Called once per step before its instructions are created
    async fn on_step_start(&self, _step_name: &str) {}

    async fn on_step_complete(&self, _step_name: &str, _result: &StepResult) {}

    /// Called for every started step that didn't complete when the
    /// flow failed. Cancellation isn't a failure: steps split off an
    /// `Auto` unit may have started and are then only listed in
    /// [`crate::executor::FlowStatus::Cancelled`].
    async fn on_step_error(
        &self,
        _step_name: &str,
        _error: &FlowExecutorError,
    ) {
    }

    async fn on_unit_state(
        &self,
        _unit_index: usize,
        _unit: &ExecutionUnit,
        _state: UnitState,
    ) {
    }
}

pub struct NoopHooks;

impl FlowHooks for NoopHooks {}
