use std::collections::HashSet;

use solana_sdk::instruction::Instruction;

use crate::{
    context::FlowContext,
    error::{FlowBuildError, FlowBuildResult, StepCreationResult},
    planner::{BatchingPlanner, ExecutionStrategy, ExecutionUnit},
    step::{CustomTransaction, InstructionCreator, Step, StepKind},
};

/// Validated, ordered sequence of uniquely named steps.
#[derive(Debug)]
pub struct Flow {
    steps: Vec<Step>,
}

impl Flow {
    pub fn builder() -> FlowBuilder {
        FlowBuilder::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.name() == name)
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(Step::name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn plan(&self, strategy: ExecutionStrategy) -> Vec<ExecutionUnit> {
        BatchingPlanner::plan(&self.steps, strategy)
    }
}

#[derive(Debug, Default)]
pub struct FlowBuilder {
    steps: Vec<Step>,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn instruction(
        self,
        name: impl Into<String>,
        creator: impl InstructionCreator + 'static,
    ) -> Self {
        self.step(Step::instruction(name, creator))
    }

    pub fn instruction_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FlowContext) -> StepCreationResult<Instruction>
            + Send
            + Sync
            + 'static,
    {
        self.step(Step::instruction_fn(name, f))
    }

    pub fn transaction(
        self,
        name: impl Into<String>,
        executor: impl CustomTransaction + 'static,
    ) -> Self {
        self.step(Step::transaction(name, executor))
    }

    pub fn atomic_group(
        self,
        name: impl Into<String>,
        creators: Vec<Box<dyn InstructionCreator>>,
    ) -> Self {
        self.step(Step::atomic_group(name, creators))
    }

    pub fn atomic_instructions(
        self,
        name: impl Into<String>,
        instructions: Vec<Instruction>,
    ) -> Self {
        self.step(Step::atomic_instructions(name, instructions))
    }

    pub fn build(self) -> FlowBuildResult<Flow> {
        if self.steps.is_empty() {
            return Err(FlowBuildError::EmptyFlow);
        }

        let mut seen = HashSet::with_capacity(self.steps.len());
        for (position, step) in self.steps.iter().enumerate() {
            if step.name().is_empty() {
                return Err(FlowBuildError::EmptyStepName(position));
            }
            if !seen.insert(step.name()) {
                return Err(FlowBuildError::DuplicateStepName(
                    step.name().to_string(),
                ));
            }
            if let StepKind::AtomicGroup(creators) = step.kind() {
                if creators.is_empty() {
                    return Err(FlowBuildError::EmptyAtomicGroup(
                        step.name().to_string(),
                    ));
                }
            }
        }

        Ok(Flow { steps: self.steps })
    }
}
