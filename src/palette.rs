//! Block states and the section-local palette that assigns them compact
//! integer IDs.

use crate::bits;
use crate::error::{ColumnError, PaletteError};
use crate::nbt::{CompoundTag, Tag};
use std::collections::{BTreeMap, HashMap};

/// Namespaced identifier of the air block.
pub const AIR_BLOCK: &str = "minecraft:air";

/// A block's visual/logical state: a namespaced name plus its property
/// map. Two states are equal iff both name and properties match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockState {
    name: String,
    properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> BlockState {
        BlockState {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// The implicit state of unset block slots.
    pub fn air() -> BlockState {
        BlockState::new(AIR_BLOCK)
    }

    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> BlockState {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_air(&self) -> bool {
        self.name == AIR_BLOCK
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Serializes as a compound with `Name` and, when any property is set,
    /// `Properties`.
    pub fn to_nbt(&self) -> CompoundTag {
        let mut compound = CompoundTag::new();
        compound.insert_str("Name", self.name.clone());

        if !self.properties.is_empty() {
            let mut properties = CompoundTag::new();

            for (key, value) in &self.properties {
                properties.insert_str(key.clone(), value.clone());
            }

            compound.insert_compound_tag("Properties", properties);
        }

        compound
    }

    pub fn from_nbt(compound: &CompoundTag) -> Result<BlockState, ColumnError> {
        let mut state = BlockState::new(compound.get_str("Name")?);

        if compound.contains_key("Properties") {
            for (key, tag) in compound.get_compound_tag("Properties")?.iter() {
                match tag {
                    Tag::String(value) => {
                        state.properties.insert(key.to_owned(), value.clone());
                    }
                    _ => {
                        return Err(ColumnError::InvalidTag {
                            tag_name: format!("Properties.{}", key),
                        })
                    }
                }
            }
        }

        Ok(state)
    }
}

/// An insertion-ordered set of unique block states with reference counts.
///
/// A state's position in the set is its local ID; removing a state shifts
/// the IDs behind it, so packed arrays must be re-encoded after removals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    states: Vec<BlockState>,
    references: HashMap<BlockState, usize>,
}

impl Palette {
    pub fn new() -> Palette {
        Palette::default()
    }

    /// Builds a palette from an ordered state list with all counts zero;
    /// callers account for usage via [`Palette::load_references`].
    pub fn from_states(states: Vec<BlockState>) -> Palette {
        let mut references = HashMap::with_capacity(states.len());

        for state in &states {
            references.entry(state.clone()).or_insert(0);
        }

        Palette { states, references }
    }

    /// Builds a single-state palette already carrying `count` references.
    pub(crate) fn seeded(state: BlockState, count: usize) -> Palette {
        let mut references = HashMap::with_capacity(1);
        references.insert(state.clone(), count);

        Palette {
            states: vec![state],
            references,
        }
    }

    /// Records one more reference to `state`, appending it with count 1
    /// when it is new.
    pub fn increase(&mut self, state: BlockState) {
        match self.references.get_mut(&state) {
            Some(count) => *count += 1,
            None => {
                self.states.push(state.clone());
                self.references.insert(state, 1);
            }
        }
    }

    /// Drops one reference to `state`, removing it (and freeing its ID)
    /// when no references remain.
    pub fn decrease(&mut self, state: &BlockState) -> Result<(), PaletteError> {
        let count = self
            .references
            .get_mut(state)
            .ok_or_else(|| PaletteError::UnknownState {
                state: state.clone(),
            })?;

        if *count > 1 {
            *count -= 1;
        } else {
            self.references.remove(state);
            self.states.retain(|existing| existing != state);
        }

        Ok(())
    }

    /// Increments counts for states already in the palette without
    /// changing their order.
    pub fn load_references<'a, I>(&mut self, states: I) -> Result<(), PaletteError>
    where
        I: IntoIterator<Item = &'a BlockState>,
    {
        for state in states {
            match self.references.get_mut(state) {
                Some(count) => *count += 1,
                None => {
                    return Err(PaletteError::UnknownState {
                        state: state.clone(),
                    })
                }
            }
        }

        Ok(())
    }

    /// Local ID of `state`: its position in the palette.
    pub fn index_of(&self, state: &BlockState) -> Option<usize> {
        // Linear scan; palettes are small.
        self.states.iter().position(|existing| existing == state)
    }

    /// Packs `states` as palette IDs with width `ceil(log2(len))`,
    /// clamped to at least one bit.
    pub fn compact_ids(&self, states: &[BlockState]) -> Result<Vec<i64>, PaletteError> {
        let ids = self.ids_of(states)?;

        Ok(bits::pack(&ids, bits::bit_length_for(self.states.len())))
    }

    pub(crate) fn ids_of(&self, states: &[BlockState]) -> Result<Vec<u64>, PaletteError> {
        states
            .iter()
            .map(|state| {
                self.index_of(state)
                    .map(|id| id as u64)
                    .ok_or_else(|| PaletteError::UnknownState {
                        state: state.clone(),
                    })
            })
            .collect()
    }

    pub fn states(&self) -> &[BlockState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Serializes as a list of state compounds in ID order.
    pub fn to_nbt(&self) -> Tag {
        Tag::List(
            self.states
                .iter()
                .map(|state| Tag::Compound(state.to_nbt()))
                .collect(),
        )
    }

    /// Loads a palette from the elements of a `Palette` list; IDs are list
    /// positions and all counts start at zero.
    pub fn from_nbt(elements: &[Tag]) -> Result<Palette, ColumnError> {
        let states = elements
            .iter()
            .map(|element| match element {
                Tag::Compound(compound) => BlockState::from_nbt(compound),
                _ => Err(ColumnError::InvalidTag {
                    tag_name: "Palette".to_owned(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Palette::from_states(states))
    }
}
