use log::debug;
use solana_sdk::instruction::Instruction;

use crate::transaction::{
    size_estimator::SizeEstimator, skeleton::TransactionSkeleton,
};

/// Instructions that are packed together or not at all
pub trait InstructionBundle {
    fn instructions(&self) -> &[Instruction];
}

impl InstructionBundle for Instruction {
    fn instructions(&self) -> &[Instruction] {
        std::slice::from_ref(self)
    }
}

impl InstructionBundle for Vec<Instruction> {
    fn instructions(&self) -> &[Instruction] {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOutcome<T> {
    /// Longest prefix of the input that fits
    pub packed: Vec<T>,
    /// Everything after it, starting with the bundle that didn't fit
    pub overflow: Vec<T>,
}

impl<T: InstructionBundle> PackOutcome<T> {
    pub fn has_overflow(&self) -> bool {
        !self.overflow.is_empty()
    }

    pub fn packed_instructions(&self) -> Vec<Instruction> {
        self.packed
            .iter()
            .flat_map(|bundle| bundle.instructions().iter().cloned())
            .collect()
    }
}

/// Packs bundles into one transaction in order. Packing stops at the
/// first bundle that doesn't fit, later bundles are never pulled
/// forward even if they would fit.
#[derive(Debug, Clone, Copy)]
pub struct InstructionPacker {
    estimator: SizeEstimator,
}

impl InstructionPacker {
    pub fn new(estimator: SizeEstimator) -> Self {
        Self { estimator }
    }

    pub fn estimator(&self) -> &SizeEstimator {
        &self.estimator
    }

    pub fn pack<T: InstructionBundle>(
        &self,
        skeleton: &TransactionSkeleton,
        bundles: Vec<T>,
    ) -> PackOutcome<T> {
        let mut committed: Vec<Instruction> = Vec::new();
        let mut packed = Vec::with_capacity(bundles.len());
        let mut bundles = bundles.into_iter();

        while let Some(bundle) = bundles.next() {
            let checkpoint = committed.len();
            let fits = bundle.instructions().iter().all(|ix| {
                let fits = self.estimator.fits(skeleton, &committed, ix);
                if fits {
                    committed.push(ix.clone());
                }
                fits
            });

            if !fits {
                committed.truncate(checkpoint);
                let overflow = std::iter::once(bundle)
                    .chain(bundles)
                    .collect::<Vec<_>>();
                debug!(
                    "Packed {} bundles with {} instructions, {} overflow",
                    packed.len(),
                    committed.len(),
                    overflow.len()
                );
                return PackOutcome { packed, overflow };
            }
            packed.push(bundle);
        }

        PackOutcome {
            packed,
            overflow: Vec::new(),
        }
    }
}
