use std::collections::VecDeque;

use log::{debug, error, info, trace, warn};
use solana_sdk::instruction::Instruction;
use tokio_util::sync::CancellationToken;

use crate::{
    context::{FlowContext, StepResult},
    executor::{
        error::{
            FlowExecutionError, FlowExecutionResult, FlowExecutorError,
            FlowExecutorResult,
        },
        hooks::FlowHooks,
        CompletedUnit, FlowOutput, FlowStatus, UnitState,
    },
    flow::Flow,
    planner::{ExecutionStrategy, ExecutionUnit, UnitKind},
    step::{Step, StepKind},
    transaction::{InstructionBundle, InstructionPacker, TransactionSkeleton},
};

/// Instructions created for a step, packed as one bundle
pub(super) struct BuiltStep {
    name: String,
    instructions: Vec<Instruction>,
}

impl InstructionBundle for BuiltStep {
    fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

/// Unit waiting to run. Units split off an overflowing unit carry the
/// instructions already created for them so creators run once per step.
pub(super) struct PendingUnit {
    unit: ExecutionUnit,
    built: Option<Vec<BuiltStep>>,
}

impl From<ExecutionUnit> for PendingUnit {
    fn from(unit: ExecutionUnit) -> Self {
        Self { unit, built: None }
    }
}

/// State of a single [`crate::executor::FlowExecutor::execute`] call
pub(super) struct FlowRun<'a> {
    pub(super) flow: &'a Flow,
    pub(super) strategy: ExecutionStrategy,
    pub(super) skeleton: TransactionSkeleton,
    pub(super) packer: InstructionPacker,
    pub(super) hooks: &'a dyn FlowHooks,
    pub(super) context: FlowContext,
    pub(super) cancel: CancellationToken,
    pub(super) queue: VecDeque<PendingUnit>,
    pub(super) started: Vec<String>,
    pub(super) completed_units: Vec<CompletedUnit>,
}

impl<'a> FlowRun<'a> {
    pub(super) async fn run(mut self) -> FlowExecutionResult<FlowOutput> {
        let mut unit_index = 0;
        while let Some(pending) = self.queue.pop_front() {
            let PendingUnit { mut unit, built } = pending;
            if self.cancel.is_cancelled() {
                let pending_steps = self.pending_steps(&unit);
                warn!(
                    "Flow cancelled before unit {}, {} steps not executed",
                    unit_index,
                    pending_steps.len()
                );
                return Ok(self.finish(FlowStatus::Cancelled { pending_steps }));
            }

            let result = self.execute_unit(unit_index, &mut unit, built).await;
            if let Err(err) = result {
                error!(
                    "Unit {} {:?} failed: {}",
                    unit_index, unit.step_names, err
                );
                self.report_state(unit_index, &unit, UnitState::Failed)
                    .await;
                self.report_step_errors(&err).await;
                return Err(FlowExecutionError {
                    error: err,
                    unit_index,
                    failing_unit: unit,
                    completed_units: self.completed_units,
                    partial_results: self.context.into_results(),
                });
            }
            unit_index += 1;
        }

        info!(
            "Flow completed with {} transactions",
            self.completed_units.len()
        );
        Ok(self.finish(FlowStatus::Completed))
    }

    fn finish(self, status: FlowStatus) -> FlowOutput {
        FlowOutput {
            status,
            results: self.context.into_results(),
            completed_units: self.completed_units,
        }
    }

    fn pending_steps(&self, next: &ExecutionUnit) -> Vec<String> {
        next.step_names
            .iter()
            .chain(self.queue.iter().flat_map(|p| p.unit.step_names.iter()))
            .cloned()
            .collect()
    }

    async fn execute_unit(
        &mut self,
        unit_index: usize,
        unit: &mut ExecutionUnit,
        built: Option<Vec<BuiltStep>>,
    ) -> FlowExecutorResult<()> {
        self.report_state(unit_index, unit, UnitState::Pending).await;
        for name in &unit.step_names {
            if !self.started.contains(name) {
                self.started.push(name.clone());
                self.hooks.on_step_start(name).await;
            }
        }

        match unit.kind {
            UnitKind::Custom => {
                self.execute_custom_unit(unit_index, unit).await
            }
            UnitKind::Batch => {
                self.execute_batch_unit(unit_index, unit, built).await
            }
        }
    }

    async fn execute_custom_unit(
        &mut self,
        unit_index: usize,
        unit: &ExecutionUnit,
    ) -> FlowExecutorResult<()> {
        let flow = self.flow;
        let (name, step) = match unit.step_names.first() {
            Some(name) => (name, Self::find_step(flow, name)?),
            None => return Ok(()),
        };
        let StepKind::Transaction(executor) = step.kind() else {
            return Err(FlowExecutorError::UnknownStep(name.clone()));
        };

        // Building, signing and sending all happen inside the step
        let result = executor.execute(&self.context).await.map_err(|err| {
            FlowExecutorError::TransactionStepError {
                step: name.clone(),
                err,
            }
        })?;
        self.report_state(unit_index, unit, UnitState::Confirmed).await;

        self.context.insert(name, result);
        self.hooks.on_step_complete(name, &result).await;
        self.completed_units.push(CompletedUnit {
            unit: unit.clone(),
            signature: result.signature,
        });
        Ok(())
    }

    async fn execute_batch_unit(
        &mut self,
        unit_index: usize,
        unit: &mut ExecutionUnit,
        built: Option<Vec<BuiltStep>>,
    ) -> FlowExecutorResult<()> {
        self.report_state(unit_index, unit, UnitState::Building).await;
        let built = match built {
            Some(built) => built,
            None => self.build_unit(unit).await?,
        };

        let outcome = self.packer.pack(&self.skeleton, built);
        if outcome.packed.is_empty() {
            let name = outcome
                .overflow
                .first()
                .map(|step| step.name.clone())
                .unwrap_or_default();
            return Err(FlowExecutorError::OversizedInstruction(name));
        }

        let mut remainder = None;
        if outcome.has_overflow() {
            let overflow_names = outcome
                .overflow
                .iter()
                .map(|step| step.name.clone())
                .collect::<Vec<_>>();
            if !self.strategy.splits_on_overflow() {
                return Err(FlowExecutorError::PackingOverflow(
                    unit.step_names.clone(),
                ));
            }

            debug!(
                "Splitting unit {}, steps {:?} move to the next unit",
                unit_index, overflow_names
            );
            unit.step_names = outcome
                .packed
                .iter()
                .map(|step| step.name.clone())
                .collect();
            remainder = Some(PendingUnit {
                unit: ExecutionUnit::batch(overflow_names),
                built: Some(outcome.overflow),
            });
        }

        self.report_state(unit_index, unit, UnitState::Signing).await;
        let recent_blockhash = self
            .context
            .submitter()
            .resolve_lifetime(self.skeleton.lifetime())
            .await
            .map_err(FlowExecutorError::LifetimeError)?;
        let instructions = outcome
            .packed
            .iter()
            .flat_map(|step| step.instructions.iter().cloned())
            .collect::<Vec<_>>();
        let transaction = self.skeleton.sign(
            self.context.authority(),
            &instructions,
            recent_blockhash,
        )?;

        self.report_state(unit_index, unit, UnitState::Sending).await;
        let signature = self
            .context
            .submitter()
            .send_and_confirm(
                &transaction,
                self.context.commitment(),
                &self.cancel,
            )
            .await?;
        self.report_state(unit_index, unit, UnitState::Confirmed).await;
        debug!(
            "Unit {} confirmed with {} instructions: {}",
            unit_index,
            instructions.len(),
            signature
        );

        let mut instruction_index = 0;
        let mut results = Vec::with_capacity(outcome.packed.len());
        for step in &outcome.packed {
            let result = StepResult::batched(signature, instruction_index);
            self.context.insert(&step.name, result);
            results.push((step.name.as_str(), result));
            instruction_index += step.instructions.len();
        }
        for (name, result) in results {
            self.hooks.on_step_complete(name, &result).await;
        }
        self.completed_units.push(CompletedUnit {
            unit: unit.clone(),
            signature,
        });

        if let Some(remainder) = remainder {
            self.queue.push_front(remainder);
        }
        Ok(())
    }

    /// Creates instructions for every step of `unit` in order.
    /// Creators of a step see results of all steps of earlier units.
    async fn build_unit(
        &self,
        unit: &ExecutionUnit,
    ) -> FlowExecutorResult<Vec<BuiltStep>> {
        let mut built = Vec::with_capacity(unit.len());
        for name in &unit.step_names {
            let step = Self::find_step(self.flow, name)?;
            let creation_error = |err| FlowExecutorError::StepCreationError {
                step: name.clone(),
                err,
            };
            let instructions = match step.kind() {
                StepKind::Instruction(creator) => {
                    vec![creator
                        .create(&self.context)
                        .await
                        .map_err(creation_error)?]
                }
                StepKind::AtomicGroup(creators) => {
                    let mut instructions = Vec::with_capacity(creators.len());
                    for creator in creators {
                        instructions.push(
                            creator
                                .create(&self.context)
                                .await
                                .map_err(creation_error)?,
                        );
                    }
                    instructions
                }
                StepKind::Transaction(_) => {
                    return Err(FlowExecutorError::UnknownStep(name.clone()))
                }
            };
            built.push(BuiltStep {
                name: name.clone(),
                instructions,
            });
        }

        Ok(built)
    }

    fn find_step<'f>(
        flow: &'f Flow,
        name: &str,
    ) -> FlowExecutorResult<&'f Step> {
        flow.step(name)
            .ok_or_else(|| FlowExecutorError::UnknownStep(name.to_string()))
    }

    async fn report_state(
        &self,
        unit_index: usize,
        unit: &ExecutionUnit,
        state: UnitState,
    ) {
        trace!("Unit {} {:?}: {:?}", unit_index, unit.step_names, state);
        self.hooks.on_unit_state(unit_index, unit, state).await;
    }

    /// Notifies every step that started but didn't complete
    async fn report_step_errors(&self, err: &FlowExecutorError) {
        for name in &self.started {
            if !self.context.results().contains(name) {
                self.hooks.on_step_error(name, err).await;
            }
        }
    }
}
