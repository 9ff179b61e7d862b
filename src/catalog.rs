//! The scenario catalog
//!
//! The catalog is loaded once at startup and checked thoroughly, since a
//! malformed template (most notably slots disagreeing on how many prompt
//! variants they offer) would break round logic in the middle of a game.
//! Loading errors are meant to abort startup.

use std::sync::Arc;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scenario::{Scenario, ScenarioDefinition, Variant};

/// Scenarios shipped with the crate
const BUILTIN_SCENARIOS: &str = include_str!("../assets/scenarios.json");

/// Errors raised while loading a catalog
#[derive(Error, Debug)]
pub enum Error {
    /// The catalog contains no scenarios
    #[error("scenario catalog is empty")]
    Empty,
    /// The catalog source is not valid JSON for a list of scenarios
    #[error("malformed scenario catalog: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A scenario failed field validation
    #[error("scenario `{scenario}` is invalid: {report}")]
    Invalid {
        /// Name of the offending scenario
        scenario: String,
        /// Validation report
        report: garde::Report,
    },
    /// Slots of a scenario offer different numbers of prompt variants
    #[error(
        "scenario `{scenario}` slot {slot} has {found} prompt variants, expected {expected}"
    )]
    MismatchedPrompts {
        /// Name of the offending scenario
        scenario: String,
        /// Index of the first slot that disagrees with slot 0
        slot: usize,
        /// Variant count of slot 0
        expected: usize,
        /// Variant count of the offending slot
        found: usize,
    },
    /// A slot extends past the scenario canvas or has no area
    #[error("scenario `{scenario}` slot {slot} does not fit the canvas")]
    SlotOutOfBounds {
        /// Name of the offending scenario
        scenario: String,
        /// Index of the offending slot
        slot: usize,
    },
}

/// Order in which scenarios are drawn for a game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Shuffle the catalog, repeating it if more rounds than scenarios
    #[default]
    Shuffled,
    /// Catalog order, repeating it if more rounds than scenarios
    InOrder,
}

/// A validated, immutable list of scenario definitions
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Vec<Arc<ScenarioDefinition>>,
}

impl Catalog {
    /// Validates `definitions` and builds a catalog from them
    ///
    /// # Errors
    ///
    /// * `Error::Empty` - No definitions were given
    /// * `Error::Invalid` - A definition fails field validation
    /// * `Error::SlotOutOfBounds` - A slot does not fit its canvas
    /// * `Error::MismatchedPrompts` - Slots disagree on the variant count
    pub fn new(definitions: Vec<ScenarioDefinition>) -> Result<Self, Error> {
        if definitions.is_empty() {
            return Err(Error::Empty);
        }

        for definition in &definitions {
            check_definition(definition)?;
        }

        Ok(Self {
            definitions: definitions.into_iter().map(Arc::new).collect_vec(),
        })
    }

    /// Parses and validates a catalog from a JSON array of scenarios
    ///
    /// # Errors
    ///
    /// `Error::Malformed` for unparsable input, otherwise as [`Catalog::new`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Self::new(serde_json::from_str(json)?)
    }

    /// The catalog of scenarios shipped with the crate
    ///
    /// # Errors
    ///
    /// Only fails if the bundled file is broken, see [`Catalog::new`].
    pub fn builtin() -> Result<Self, Error> {
        Self::from_json(BUILTIN_SCENARIOS)
    }

    /// Number of scenarios in the catalog
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog is empty (never true for a constructed catalog)
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the definition at `index`
    pub fn get(&self, index: usize) -> Option<&Arc<ScenarioDefinition>> {
        self.definitions.get(index)
    }

    /// Picks `count` definitions for the rounds of a game
    ///
    /// Scenarios repeat only once the whole catalog has been used.
    pub fn select(
        &self,
        count: usize,
        selection: Selection,
        rng: &mut fastrand::Rng,
    ) -> Vec<Arc<ScenarioDefinition>> {
        let mut order = (0..self.definitions.len()).collect_vec();
        if selection == Selection::Shuffled {
            rng.shuffle(&mut order);
        }

        order
            .into_iter()
            .cycle()
            .take(count)
            .map(|index| Arc::clone(&self.definitions[index]))
            .collect_vec()
    }

    /// Picks `count` definitions and realises each as a round template
    pub fn instantiate_rounds(
        &self,
        count: usize,
        selection: Selection,
        variant: Variant,
        rng: &mut fastrand::Rng,
    ) -> Vec<Scenario> {
        self.select(count, selection, rng)
            .into_iter()
            .map(|definition| Scenario::instantiate(definition, variant, rng))
            .collect_vec()
    }
}

fn check_definition(definition: &ScenarioDefinition) -> Result<(), Error> {
    definition.validate().map_err(|report| Error::Invalid {
        scenario: definition.name.clone(),
        report,
    })?;

    if let Some(slot) = definition
        .slots
        .iter()
        .position(|slot| !slot.fits_within(definition.size))
    {
        return Err(Error::SlotOutOfBounds {
            scenario: definition.name.clone(),
            slot,
        });
    }

    let expected = definition.prompt_variants();
    if let Some((slot, found)) = definition
        .slots
        .iter()
        .map(|slot| slot.prompts.len())
        .enumerate()
        .find(|(_, found)| *found != expected)
    {
        return Err(Error::MismatchedPrompts {
            scenario: definition.name.clone(),
            slot,
            expected,
            found,
        });
    }

    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::testing::definition;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 6);
        assert!(!catalog.is_empty());
        assert!(
            catalog
                .get(0)
                .unwrap()
                .foreground
                .as_deref()
                .is_some_and(|path| path.ends_with(".png"))
        );
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(Catalog::new(Vec::new()), Err(Error::Empty)));
    }

    #[test]
    fn test_mismatched_prompt_counts_rejected() {
        let def = definition("Uneven", &[&["a", "b"], &["c", "d"], &["e"]]);
        match Catalog::new(vec![def]) {
            Err(Error::MismatchedPrompts {
                scenario,
                slot,
                expected,
                found,
            }) => {
                assert_eq!(scenario, "Uneven");
                assert_eq!(slot, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_slot_out_of_bounds_rejected() {
        let mut def = definition("Overflow", &[&["a"], &["b"]]);
        def.slots[1].position.x = def.size.width;
        assert!(matches!(
            Catalog::new(vec![def]),
            Err(Error::SlotOutOfBounds { slot: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_field_rejected() {
        let mut def = definition("Nameless", &[&["a"]]);
        def.name = String::new();
        assert!(matches!(
            Catalog::new(vec![def]),
            Err(Error::Invalid { .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_json_round_trip_of_definitions() {
        let defs = vec![definition("One", &[&["a"]]), definition("Two", &[&["b"]])];
        let json = serde_json::to_string(&defs).unwrap();
        let catalog = Catalog::from_json(&json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().name, "Two");
    }

    #[test]
    fn test_select_in_order_cycles() {
        let catalog = Catalog::new(vec![
            definition("One", &[&["a"]]),
            definition("Two", &[&["b"]]),
        ])
        .unwrap();
        let mut rng = fastrand::Rng::with_seed(1);

        let names = catalog
            .select(5, Selection::InOrder, &mut rng)
            .iter()
            .map(|def| def.name.clone())
            .collect_vec();
        assert_eq!(names, ["One", "Two", "One", "Two", "One"]);
    }

    #[test]
    fn test_select_shuffled_uses_whole_catalog_before_repeating() {
        let catalog = Catalog::builtin().unwrap();
        let mut rng = fastrand::Rng::with_seed(9);

        let picked = catalog.select(catalog.len(), Selection::Shuffled, &mut rng);
        let unique = picked.iter().map(|def| def.name.as_str()).unique().count();
        assert_eq!(unique, catalog.len());
    }

    #[test]
    fn test_select_is_deterministic_for_seed() {
        let catalog = Catalog::builtin().unwrap();
        let pick = |seed| {
            let mut rng = fastrand::Rng::with_seed(seed);
            catalog
                .select(3, Selection::Shuffled, &mut rng)
                .iter()
                .map(|def| def.name.clone())
                .collect_vec()
        };
        assert_eq!(pick(11), pick(11));
    }

    #[test]
    fn test_instantiate_rounds() {
        let catalog = Catalog::builtin().unwrap();
        let mut rng = fastrand::Rng::with_seed(5);

        let rounds = catalog.instantiate_rounds(3, Selection::InOrder, Variant::Fixed(0), &mut rng);
        assert_eq!(rounds.len(), 3);
        assert!(rounds.iter().all(|round| round.variant() == 0));
        assert_eq!(rounds[0].definition().name, catalog.get(0).unwrap().name);
    }
}
