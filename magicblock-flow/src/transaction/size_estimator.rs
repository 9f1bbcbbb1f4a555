use log::trace;
use solana_sdk::instruction::Instruction;

use crate::transaction::skeleton::TransactionSkeleton;

/// Decides whether instructions fit in a transaction of at most
/// `ceiling` serialized bytes. The size is measured on the compiled
/// transaction rather than estimated, so accounts shared between
/// instructions are counted once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimator {
    ceiling: usize,
}

impl SizeEstimator {
    pub fn new(ceiling: usize) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Whether `candidate` can be appended to `committed`.
    /// Anything that can't be compiled doesn't fit.
    pub fn fits(
        &self,
        skeleton: &TransactionSkeleton,
        committed: &[Instruction],
        candidate: &Instruction,
    ) -> bool {
        let mut trial = Vec::with_capacity(committed.len() + 1);
        trial.extend_from_slice(committed);
        trial.push(candidate.clone());
        self.fits_all(skeleton, &trial)
    }

    pub fn fits_all(
        &self,
        skeleton: &TransactionSkeleton,
        instructions: &[Instruction],
    ) -> bool {
        match skeleton.serialized_size(instructions) {
            Ok(size) => size <= self.ceiling,
            Err(err) => {
                trace!(
                    "Treating {} instructions as not fitting: {}",
                    instructions.len(),
                    err
                );
                false
            }
        }
    }
}
