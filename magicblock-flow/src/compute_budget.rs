use serde::{Deserialize, Serialize};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction, instruction::Instruction,
};

// -----------------
// ComputeBudgetConfig
// -----------------
/// Compute budget instructions prepended to every batched transaction.
/// They count towards the transaction size.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ComputeBudgetConfig {
    #[serde(default)]
    pub compute_unit_limit: Option<u32>,
    #[serde(default)]
    pub compute_unit_price: Option<u64>,
}

impl ComputeBudgetConfig {
    pub fn new(compute_unit_limit: u32, compute_unit_price: u64) -> Self {
        Self {
            compute_unit_limit: Some(compute_unit_limit),
            compute_unit_price: Some(compute_unit_price),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.compute_unit_limit.is_none() && self.compute_unit_price.is_none()
    }

    pub fn instructions(&self) -> Vec<Instruction> {
        let limit = self
            .compute_unit_limit
            .map(ComputeBudgetInstruction::set_compute_unit_limit);
        let price = self
            .compute_unit_price
            .map(ComputeBudgetInstruction::set_compute_unit_price);
        limit.into_iter().chain(price).collect()
    }
}
