pub mod packer;
pub mod size_estimator;
pub mod skeleton;

pub use packer::{InstructionBundle, InstructionPacker, PackOutcome};
pub use size_estimator::SizeEstimator;
pub use skeleton::{Lifetime, SkeletonError, TransactionSkeleton};
