//! Scenario templates and their per-round instances
//!
//! A [`ScenarioDefinition`] is a static picture template: a background,
//! an optional foreground drawn on top, and a list of slots, each of which
//! carries the same number of alternative prompts. A [`Scenario`] is one
//! realisation of a definition with a single prompt variant chosen, ready
//! for players to fill.

use std::sync::Arc;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Top-left corner of a slot on the scenario canvas, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset from the left edge
    pub x: u32,
    /// Vertical offset from the top edge
    pub y: u32,
}

/// Dimensions of a slot or canvas, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// A placeholder region in a scenario template
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SlotDefinition {
    /// Where the submitted image is placed
    #[garde(skip)]
    pub position: Position,
    /// Size the submitted image is stretched to
    #[garde(skip)]
    pub size: Size,
    /// Alternative prompts; the chosen variant index picks one per slot
    #[garde(
        length(min = 1, max = constants::scenario::MAX_PROMPT_VARIANTS),
        inner(length(min = 1, max = constants::scenario::MAX_PROMPT_LENGTH))
    )]
    pub prompts: Vec<String>,
}

impl SlotDefinition {
    /// Whether the slot lies entirely within a canvas of the given size
    pub fn fits_within(&self, canvas: Size) -> bool {
        self.size.width > 0
            && self.size.height > 0
            && u64::from(self.position.x) + u64::from(self.size.width) <= u64::from(canvas.width)
            && u64::from(self.position.y) + u64::from(self.size.height)
                <= u64::from(canvas.height)
    }
}

/// A static picture template from the scenario catalog
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScenarioDefinition {
    /// Human readable title
    #[garde(length(min = 1, max = constants::scenario::MAX_NAME_LENGTH))]
    pub name: String,
    /// Canvas size; the background is expected to have these dimensions
    #[garde(skip)]
    pub size: Size,
    /// Path of the background image, relative to the asset directory
    #[garde(length(min = 1))]
    pub background: String,
    /// Path of an image drawn over the filled slots
    #[garde(skip)]
    pub foreground: Option<String>,
    /// Slots to be filled by players
    #[garde(length(min = 1, max = constants::scenario::MAX_SLOTS), dive)]
    pub slots: Vec<SlotDefinition>,
}

impl ScenarioDefinition {
    /// Number of prompt variants, taken from the first slot
    ///
    /// The catalog guarantees every slot has the same count.
    pub fn prompt_variants(&self) -> usize {
        self.slots.first().map_or(0, |slot| slot.prompts.len())
    }
}

/// How the prompt variant of a scenario instance is picked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// Uniformly at random among the definition's variants
    #[default]
    Random,
    /// A fixed variant index, wrapped to the available variants
    Fixed(usize),
}

/// A submitted image, as encoded bytes received from the platform
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From)]
pub struct Image(Arc<[u8]>);

impl Image {
    /// The encoded image bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Image {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

/// A slot of a scenario instance
#[derive(Debug, Clone)]
pub struct Slot {
    position: Position,
    size: Size,
    prompt: String,
    submitted: Option<Image>,
}

impl Slot {
    /// Where the submitted image goes
    pub fn position(&self) -> Position {
        self.position
    }

    /// The size the submitted image is stretched to
    pub fn size(&self) -> Size {
        self.size
    }

    /// Instruction shown to the player responsible for this slot
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The image submitted for this slot, if any
    pub fn submitted(&self) -> Option<&Image> {
        self.submitted.as_ref()
    }

    /// Whether an image has been submitted
    pub fn is_filled(&self) -> bool {
        self.submitted.is_some()
    }

    pub(crate) fn fill(&mut self, image: Image) {
        self.submitted = Some(image);
    }
}

/// One realisation of a [`ScenarioDefinition`]
///
/// Cloning gives an independent set of slots while sharing the immutable
/// definition, which is how every team gets its own copy of a round.
#[derive(Debug, Clone)]
pub struct Scenario {
    definition: Arc<ScenarioDefinition>,
    variant: usize,
    slots: Vec<Slot>,
}

impl Scenario {
    /// Creates an instance of `definition` with an empty slot for every
    /// slot definition
    ///
    /// # Arguments
    ///
    /// * `definition` - The catalog entry to realise
    /// * `variant` - How to pick the prompt variant
    /// * `rng` - Random source used for [`Variant::Random`]
    pub fn instantiate(
        definition: Arc<ScenarioDefinition>,
        variant: Variant,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let variants = definition.prompt_variants().max(1);
        let variant = match variant {
            Variant::Random => rng.usize(0..variants),
            Variant::Fixed(index) => index % variants,
        };

        let slots = definition
            .slots
            .iter()
            .map(|slot| Slot {
                position: slot.position,
                size: slot.size,
                prompt: slot
                    .prompts
                    .get(variant)
                    .or(slot.prompts.first())
                    .cloned()
                    .unwrap_or_default(),
                submitted: None,
            })
            .collect_vec();

        Self {
            definition,
            variant,
            slots,
        }
    }

    /// The catalog entry this instance was made from
    pub fn definition(&self) -> &ScenarioDefinition {
        &self.definition
    }

    /// The chosen prompt variant index
    pub fn variant(&self) -> usize {
        self.variant
    }

    /// Slots in template order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    /// Number of slots still waiting for an image
    pub fn unfilled_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_filled()).count()
    }

    /// Whether every slot has an image
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Slot::is_filled)
    }
}
