//! Property-based tests for the state space and transition model.

use proptest::prelude::*;

use egt::distributions::stars_bars;
use egt::{Behavior, MatrixGame, StateSpace, TransitionModel, UpdateRule};

/// Strategy: (population size, number of strategies) with K kept small.
fn space_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=12, 1usize..=4)
}

/// Strategy: a random S×S payoff matrix with S in 2..=3.
fn game_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (2usize..=3).prop_flat_map(|s| prop::collection::vec(prop::collection::vec(-5.0..5.0f64, s), s))
}

proptest! {
    // 1. Index and composition are inverse bijections
    #[test]
    fn index_round_trip((z, s) in space_strategy()) {
        let space = StateSpace::new(z, s).unwrap();
        for index in 0..space.size() {
            let composition = space.composition_of(index).unwrap();
            prop_assert_eq!(composition.population_size() as usize, z);
            prop_assert_eq!(space.index_of(&composition).unwrap(), index);
        }
    }

    // 2. Size matches the stars-and-bars count
    #[test]
    fn size_is_stars_and_bars((z, s) in space_strategy()) {
        let space = StateSpace::new(z, s).unwrap();
        prop_assert_eq!(space.size() as u128, stars_bars(z as u64, s as u64).unwrap());
        prop_assert_eq!(space.enumerate().count(), space.size());
    }

    // 3. Enumeration is strictly increasing in lexicographic order
    #[test]
    fn enumeration_sorted((z, s) in space_strategy()) {
        let space = StateSpace::new(z, s).unwrap();
        let all: Vec<_> = space.enumerate().collect();
        for pair in all.windows(2) {
            prop_assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    // 4. Every row is a probability distribution over single-switch neighbors
    #[test]
    fn rows_are_stochastic(
        rows in game_strategy(),
        z in 2usize..=10,
        mu in 0.0..=1.0f64,
        beta in 0.0..=20.0f64,
        moran in any::<bool>(),
    ) {
        let s = rows.len();
        let game = MatrixGame::from_rows(rows).unwrap();
        let space = StateSpace::new(z, s).unwrap();
        let rule = if moran { UpdateRule::Moran } else { UpdateRule::PairwiseComparison };
        let model = TransitionModel::new(&game, space.clone(), mu, beta).unwrap().with_rule(rule);
        for index in 0..space.size() {
            let row = model.transitions_from(index).unwrap();
            let total: f64 = row.iter().map(|e| e.probability).sum();
            prop_assert!((total - 1.0).abs() < 1e-9, "row {index} sums to {total}");
            prop_assert!(row.len() <= s * (s - 1) + 1);
            for entry in &row {
                prop_assert!(entry.probability >= 0.0);
                prop_assert_eq!(entry.from, index);
            }
        }
    }

    // 5. Without mutation monomorphic states are absorbing
    #[test]
    fn monomorphic_absorbing_without_mutation(rows in game_strategy(), z in 2usize..=10, beta in 0.0..=20.0f64) {
        let s = rows.len();
        let game = MatrixGame::from_rows(rows).unwrap();
        let space = StateSpace::new(z, s).unwrap();
        let model = TransitionModel::new(&game, space.clone(), 0.0, beta).unwrap();
        for strategy in 0..s {
            let index = space.monomorphic_index(strategy).unwrap();
            let row = model.transitions_from(index).unwrap();
            prop_assert_eq!(row.len(), 1);
            prop_assert_eq!(row[0].to, index);
            prop_assert!((row[0].probability - 1.0).abs() < 1e-12);
        }
    }

    // 6. Parsed mixed behaviors keep their probability and render by name
    #[test]
    fn behavior_parse(p in 0.0..=1.0f64, g in 0.0..=1.0f64) {
        let random: Behavior = format!("random:{p}").parse().unwrap();
        prop_assert_eq!(random, Behavior::Random { p });
        prop_assert!(random.to_string().starts_with("Random("));
        let generous: Behavior = format!("gtft:{g}").parse().unwrap();
        prop_assert_eq!(generous, Behavior::GenerousTitForTat { generosity: g });
        prop_assert!(generous.validate().is_ok());
    }
}
