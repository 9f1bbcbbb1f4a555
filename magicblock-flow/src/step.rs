use std::fmt;

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;

use crate::{
    context::{FlowContext, StepResult},
    error::StepCreationResult,
};

/// Produces the instruction of a step once the steps it depends on
/// have completed.
#[async_trait]
pub trait InstructionCreator: Send + Sync {
    async fn create(
        &self,
        ctx: &FlowContext,
    ) -> StepCreationResult<Instruction>;
}

#[async_trait]
impl InstructionCreator for Instruction {
    async fn create(&self, _: &FlowContext) -> StepCreationResult<Instruction> {
        Ok(self.clone())
    }
}

/// [`InstructionCreator`] backed by a synchronous closure
pub struct FnInstructionCreator<F>(pub F);

#[async_trait]
impl<F> InstructionCreator for FnInstructionCreator<F>
where
    F: Fn(&FlowContext) -> StepCreationResult<Instruction> + Send + Sync,
{
    async fn create(
        &self,
        ctx: &FlowContext,
    ) -> StepCreationResult<Instruction> {
        (self.0)(ctx)
    }
}

/// Step that builds, signs and submits its own transaction.
/// It is never batched with other steps.
#[async_trait]
pub trait CustomTransaction: Send + Sync {
    async fn execute(&self, ctx: &FlowContext)
        -> StepCreationResult<StepResult>;
}

pub enum StepKind {
    Instruction(Box<dyn InstructionCreator>),
    Transaction(Box<dyn CustomTransaction>),
    /// Instructions that always land in the same transaction
    /// contiguously and in order
    AtomicGroup(Vec<Box<dyn InstructionCreator>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    Instruction,
    Transaction,
    AtomicGroup,
}

pub struct Step {
    name: String,
    kind: StepKind,
}

impl Step {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn instruction(
        name: impl Into<String>,
        creator: impl InstructionCreator + 'static,
    ) -> Self {
        Self::new(name, StepKind::Instruction(Box::new(creator)))
    }

    pub fn instruction_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FlowContext) -> StepCreationResult<Instruction>
            + Send
            + Sync
            + 'static,
    {
        Self::instruction(name, FnInstructionCreator(f))
    }

    pub fn transaction(
        name: impl Into<String>,
        executor: impl CustomTransaction + 'static,
    ) -> Self {
        Self::new(name, StepKind::Transaction(Box::new(executor)))
    }

    pub fn atomic_group(
        name: impl Into<String>,
        creators: Vec<Box<dyn InstructionCreator>>,
    ) -> Self {
        Self::new(name, StepKind::AtomicGroup(creators))
    }

    pub fn atomic_instructions(
        name: impl Into<String>,
        instructions: Vec<Instruction>,
    ) -> Self {
        let creators = instructions
            .into_iter()
            .map(|ix| Box::new(ix) as Box<dyn InstructionCreator>)
            .collect();
        Self::atomic_group(name, creators)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn step_type(&self) -> StepType {
        match self.kind {
            StepKind::Instruction(_) => StepType::Instruction,
            StepKind::Transaction(_) => StepType::Transaction,
            StepKind::AtomicGroup(_) => StepType::AtomicGroup,
        }
    }

    /// Whether the step contributes instructions to batched transactions
    pub fn produces_instructions(&self) -> bool {
        self.step_type() != StepType::Transaction
    }

    pub fn instruction_count(&self) -> usize {
        match &self.kind {
            StepKind::Instruction(_) => 1,
            StepKind::Transaction(_) => 0,
            StepKind::AtomicGroup(creators) => creators.len(),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("type", &self.step_type())
            .field("instructions", &self.instruction_count())
            .finish()
    }
}
