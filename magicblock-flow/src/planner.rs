use serde::{Deserialize, Serialize};

use crate::step::{Step, StepType};

/// How steps are grouped into transactions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// Batches like [`ExecutionStrategy::Batch`] but splits a unit at its
    /// first step that doesn't fit and runs the rest as a new unit.
    #[default]
    Auto,
    /// Every maximal run of instruction producing steps is one transaction.
    /// Fails if such a run doesn't fit.
    Batch,
    /// One transaction per step.
    Sequential,
}

impl ExecutionStrategy {
    pub fn splits_on_overflow(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Instructions of all steps packed into one transaction
    Batch,
    /// Single transaction step that submits on its own
    Custom,
}

/// Group of consecutive steps submitted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    pub step_names: Vec<String>,
    pub kind: UnitKind,
}

impl ExecutionUnit {
    pub fn batch(step_names: Vec<String>) -> Self {
        Self {
            step_names,
            kind: UnitKind::Batch,
        }
    }

    pub fn custom(step_name: impl Into<String>) -> Self {
        Self {
            step_names: vec![step_name.into()],
            kind: UnitKind::Custom,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.kind == UnitKind::Custom
    }

    pub fn len(&self) -> usize {
        self.step_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.step_names.is_empty()
    }

    pub fn contains(&self, step_name: &str) -> bool {
        self.step_names.iter().any(|name| name == step_name)
    }
}

pub struct BatchingPlanner;

impl BatchingPlanner {
    /// Splits `steps` into execution units preserving their order.
    /// Transaction steps always get a unit of their own and break batching;
    /// nothing else does. Sizes aren't considered here, that is done
    /// once instructions exist.
    pub fn plan(
        steps: &[Step],
        strategy: ExecutionStrategy,
    ) -> Vec<ExecutionUnit> {
        let mut units = Vec::new();
        let mut current = Vec::new();
        for step in steps {
            match (step.step_type(), strategy) {
                (StepType::Transaction, _) => {
                    if !current.is_empty() {
                        units.push(ExecutionUnit::batch(std::mem::take(
                            &mut current,
                        )));
                    }
                    units.push(ExecutionUnit::custom(step.name()));
                }
                (_, ExecutionStrategy::Sequential) => {
                    units.push(ExecutionUnit::batch(vec![step
                        .name()
                        .to_string()]));
                }
                _ => current.push(step.name().to_string()),
            }
        }
        if !current.is_empty() {
            units.push(ExecutionUnit::batch(current));
        }

        units
    }
}

#[cfg(test)]
mod tests {
    use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

    use super::*;
    use crate::stubs::NoopTransaction;

    fn ix() -> Instruction {
        Instruction::new_with_bytes(Pubkey::new_unique(), &[1], vec![])
    }

    fn ix_step(name: &str) -> Step {
        Step::instruction(name, ix())
    }

    fn tx_step(name: &str) -> Step {
        Step::transaction(name, NoopTransaction)
    }

    fn group_step(name: &str) -> Step {
        Step::atomic_instructions(name, vec![ix(), ix()])
    }

    fn names(unit: &ExecutionUnit) -> Vec<&str> {
        unit.step_names.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_instruction_steps_form_single_unit() {
        let steps = vec![ix_step("a"), ix_step("b"), group_step("c")];
        for strategy in [ExecutionStrategy::Auto, ExecutionStrategy::Batch] {
            let units = BatchingPlanner::plan(&steps, strategy);
            assert_eq!(units.len(), 1);
            assert_eq!(names(&units[0]), vec!["a", "b", "c"]);
            assert_eq!(units[0].kind, UnitKind::Batch);
        }
    }

    #[test]
    fn test_transaction_step_breaks_batch() {
        let steps = vec![
            ix_step("a"),
            ix_step("b"),
            tx_step("c"),
            ix_step("d"),
            ix_step("e"),
        ];
        let units = BatchingPlanner::plan(&steps, ExecutionStrategy::Batch);
        assert_eq!(units.len(), 3);
        assert_eq!(names(&units[0]), vec!["a", "b"]);
        assert_eq!(names(&units[1]), vec!["c"]);
        assert!(units[1].is_custom());
        assert_eq!(names(&units[2]), vec!["d", "e"]);
    }

    #[test]
    fn test_adjacent_transaction_steps() {
        let steps = vec![tx_step("a"), tx_step("b"), ix_step("c")];
        let units = BatchingPlanner::plan(&steps, ExecutionStrategy::Auto);
        assert_eq!(
            units,
            vec![
                ExecutionUnit::custom("a"),
                ExecutionUnit::custom("b"),
                ExecutionUnit::batch(vec!["c".to_string()]),
            ]
        );
    }

    #[test]
    fn test_sequential_unit_per_step() {
        let steps =
            vec![ix_step("a"), group_step("b"), tx_step("c"), ix_step("d")];
        let units =
            BatchingPlanner::plan(&steps, ExecutionStrategy::Sequential);
        assert_eq!(units.len(), 4);
        assert!(units.iter().all(|unit| unit.len() == 1));
        assert!(units[2].is_custom());
        assert!(!units[1].is_custom());
    }

    #[test]
    fn test_plan_preserves_step_sequence() {
        // i: instruction, g: atomic group, t: transaction
        let layouts = ["i", "t", "iig", "tit", "ittgi", "ggtti", "tiigitg"];
        let strategies = [
            ExecutionStrategy::Auto,
            ExecutionStrategy::Batch,
            ExecutionStrategy::Sequential,
        ];
        for layout in layouts {
            let steps = layout
                .chars()
                .enumerate()
                .map(|(i, kind)| {
                    let name = format!("{kind}{i}");
                    match kind {
                        'i' => ix_step(&name),
                        'g' => group_step(&name),
                        _ => tx_step(&name),
                    }
                })
                .collect::<Vec<_>>();
            let expected = steps.iter().map(Step::name).collect::<Vec<_>>();

            for strategy in strategies {
                let units = BatchingPlanner::plan(&steps, strategy);
                assert_eq!(units, BatchingPlanner::plan(&steps, strategy));

                let flattened = units
                    .iter()
                    .flat_map(|unit| unit.step_names.iter())
                    .map(String::as_str)
                    .collect::<Vec<_>>();
                assert_eq!(flattened, expected, "{layout} {strategy:?}");

                for unit in &units {
                    assert!(!unit.is_empty());
                    let has_tx = unit
                        .step_names
                        .iter()
                        .any(|name| name.starts_with('t'));
                    assert_eq!(has_tx, unit.is_custom());
                    if unit.is_custom() {
                        assert_eq!(unit.len(), 1);
                    }
                }
                if strategy == ExecutionStrategy::Sequential {
                    assert_eq!(units.len(), steps.len());
                } else {
                    // Batches are maximal
                    assert!(units.windows(2).all(|pair| {
                        pair[0].is_custom() || pair[1].is_custom()
                    }));
                }
            }
        }
    }

    #[test]
    fn test_empty_steps() {
        assert!(BatchingPlanner::plan(&[], ExecutionStrategy::Auto).is_empty());
    }

    #[test]
    fn test_strategy_deserialization() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: ExecutionStrategy,
        }
        let wrapper: Wrapper = toml::from_str("strategy = \"auto\"").unwrap();
        assert_eq!(wrapper.strategy, ExecutionStrategy::Auto);
        assert!(toml::from_str::<Wrapper>("strategy = \"Auto\"").is_err());
    }
}
