use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, CompileError, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::{Signer, SignerError},
    system_instruction,
    transaction::VersionedTransaction,
};

use crate::compute_budget::ComputeBudgetConfig;

#[derive(thiserror::Error, Debug)]
pub enum SkeletonError {
    #[error("Instruction data of {0} bytes exceeds u16::MAX")]
    InstructionDataTooLarge(usize),
    #[error("CompileError: {0}")]
    CompileError(#[from] CompileError),
    #[error("SignerError: {0}")]
    SignerError(#[from] SignerError),
    #[error("Failed to serialize transaction: {0}")]
    SerializationError(#[from] bincode::Error),
}

pub type SkeletonResult<T, E = SkeletonError> = Result<T, E>;

/// What a transaction's recent blockhash is taken from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifetime {
    /// Latest blockhash fetched right before signing
    #[default]
    LatestBlockhash,
    /// Fixed blockhash
    Blockhash(Hash),
    /// Value stored in a nonce account whose authority is the fee payer.
    /// Transactions start with an instruction advancing that nonce.
    DurableNonce { nonce_account: Pubkey },
}

/// Everything a batched transaction carries besides the packed
/// instructions. Sizes computed from it are the sizes of the
/// transactions that are actually sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSkeleton {
    fee_payer: Pubkey,
    lifetime: Lifetime,
    compute_budget: ComputeBudgetConfig,
}

impl TransactionSkeleton {
    pub fn new(fee_payer: Pubkey) -> Self {
        Self {
            fee_payer,
            lifetime: Lifetime::default(),
            compute_budget: ComputeBudgetConfig::default(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_compute_budget(
        mut self,
        compute_budget: ComputeBudgetConfig,
    ) -> Self {
        self.compute_budget = compute_budget;
        self
    }

    pub fn fee_payer(&self) -> &Pubkey {
        &self.fee_payer
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    pub fn compute_budget(&self) -> &ComputeBudgetConfig {
        &self.compute_budget
    }

    /// Instructions placed before the packed ones. The nonce advance
    /// has to be the very first instruction of a durable transaction.
    pub fn prefix_instructions(&self) -> Vec<Instruction> {
        let advance_nonce = match self.lifetime {
            Lifetime::DurableNonce { nonce_account } => {
                Some(system_instruction::advance_nonce_account(
                    &nonce_account,
                    &self.fee_payer,
                ))
            }
            Lifetime::LatestBlockhash | Lifetime::Blockhash(_) => None,
        };
        advance_nonce
            .into_iter()
            .chain(self.compute_budget.instructions())
            .collect()
    }

    pub fn compile(
        &self,
        instructions: &[Instruction],
        recent_blockhash: Hash,
    ) -> SkeletonResult<VersionedMessage> {
        // Message serialization panics on data longer than u16::MAX
        if let Some(ix) = instructions
            .iter()
            .find(|ix| ix.data.len() > u16::MAX as usize)
        {
            return Err(SkeletonError::InstructionDataTooLarge(ix.data.len()));
        }

        let message = v0::Message::try_compile(
            &self.fee_payer,
            &[self.prefix_instructions().as_slice(), instructions].concat(),
            &[],
            recent_blockhash,
        )?;
        Ok(VersionedMessage::V0(message))
    }

    pub fn sign(
        &self,
        authority: &Keypair,
        instructions: &[Instruction],
        recent_blockhash: Hash,
    ) -> SkeletonResult<VersionedTransaction> {
        if authority.pubkey() != self.fee_payer {
            return Err(SignerError::KeypairPubkeyMismatch.into());
        }
        let message = self.compile(instructions, recent_blockhash)?;
        Ok(VersionedTransaction::try_new(message, &[authority])?)
    }

    /// Wire size of the signed transaction carrying `instructions`.
    /// Signatures and blockhash have fixed sizes so placeholders are used.
    pub fn serialized_size(
        &self,
        instructions: &[Instruction],
    ) -> SkeletonResult<usize> {
        let message = self.compile(instructions, Hash::default())?;
        let transaction = VersionedTransaction {
            signatures: vec![
                Signature::default();
                message.header().num_required_signatures as usize
            ],
            message,
        };
        Ok(bincode::serialized_size(&transaction)? as usize)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use solana_sdk::{
        compute_budget, instruction::AccountMeta, system_program,
    };

    use super::*;

    fn ix(data_len: usize) -> Instruction {
        Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &vec![1; data_len],
            vec![AccountMeta::new(Pubkey::new_unique(), false)],
        )
    }

    #[test]
    fn test_size_matches_signed_transaction() {
        let authority = Keypair::new();
        let skeleton = TransactionSkeleton::new(authority.pubkey())
            .with_compute_budget(ComputeBudgetConfig::new(100_000, 1));
        let ixs = vec![ix(10), ix(100)];

        let tx = skeleton
            .sign(&authority, &ixs, Hash::new_unique())
            .unwrap();
        let expected = bincode::serialized_size(&tx).unwrap() as usize;
        assert_eq!(skeleton.serialized_size(&ixs).unwrap(), expected);
    }

    #[test]
    fn test_size_grows_with_data() {
        let skeleton = TransactionSkeleton::new(Pubkey::new_unique());
        let program_id = Pubkey::new_unique();
        let small = Instruction::new_with_bytes(program_id, &[0; 10], vec![]);
        let large = Instruction::new_with_bytes(program_id, &[0; 110], vec![]);

        let small_size = skeleton.serialized_size(&[small]).unwrap();
        let large_size = skeleton.serialized_size(&[large]).unwrap();
        assert_eq!(large_size - small_size, 100);
    }

    #[test]
    fn test_prefix_order() {
        let fee_payer = Pubkey::new_unique();
        let nonce_account = Pubkey::new_unique();
        let skeleton = TransactionSkeleton::new(fee_payer)
            .with_lifetime(Lifetime::DurableNonce { nonce_account })
            .with_compute_budget(ComputeBudgetConfig::new(1, 1));

        let prefix = skeleton.prefix_instructions();
        assert_eq!(prefix.len(), 3);
        assert_eq!(prefix[0].program_id, system_program::id());
        assert_eq!(prefix[0].accounts[0].pubkey, nonce_account);
        assert_eq!(prefix[1].program_id, compute_budget::id());
        assert_eq!(prefix[2].program_id, compute_budget::id());
    }

    #[test]
    fn test_blockhash_lifetimes_have_no_prefix() {
        let skeleton = TransactionSkeleton::new(Pubkey::new_unique())
            .with_lifetime(Lifetime::Blockhash(Hash::new_unique()));
        assert!(skeleton.prefix_instructions().is_empty());
    }

    #[test]
    fn test_oversized_data_is_an_error() {
        let skeleton = TransactionSkeleton::new(Pubkey::new_unique());
        assert_matches!(
            skeleton.serialized_size(&[ix(u16::MAX as usize + 1)]),
            Err(SkeletonError::InstructionDataTooLarge(_))
        );
    }

    #[test]
    fn test_too_many_accounts_is_an_error() {
        let skeleton = TransactionSkeleton::new(Pubkey::new_unique());
        let ixs = (0..300).map(|_| ix(0)).collect::<Vec<_>>();
        assert_matches!(
            skeleton.serialized_size(&ixs),
            Err(SkeletonError::CompileError(
                CompileError::AccountIndexOverflow
            ))
        );
    }

    #[test]
    fn test_sign_rejects_foreign_authority() {
        let skeleton = TransactionSkeleton::new(Pubkey::new_unique());
        assert_matches!(
            skeleton.sign(&Keypair::new(), &[ix(1)], Hash::new_unique()),
            Err(SkeletonError::SignerError(_))
        );
    }
}
