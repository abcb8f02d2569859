//! A chunk section: a 16x16x16 block grid over its own palette, plus the
//! 4x4x4 biome sub-grid.

use crate::bits;
use crate::error::{ColumnError, PaletteError};
use crate::nbt::CompoundTag;
use crate::palette::{BlockState, Palette};

/// Block slots in a section.
pub const SECTION_BLOCK_COUNT: usize = 16 * 16 * 16;
/// Biome entries in a section; biome volumes are 4x4x4 blocks.
pub const SECTION_BIOME_COUNT: usize = 4 * 4 * 4;
/// Biome value of entries that were never set.
pub const UNKNOWN_BIOME: i32 = -1;

/// One of the 16 vertical slices of a chunk column.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSection {
    y: u8,
    palette: Palette,
    blocks: Vec<BlockState>,
    biomes: [i32; SECTION_BIOME_COUNT],
}

fn block_index(x: u8, y: u8, z: u8) -> usize {
    debug_assert!(16 > x, "Section block x coordinate out of bounds");
    debug_assert!(16 > y, "Section block y coordinate out of bounds");
    debug_assert!(16 > z, "Section block z coordinate out of bounds");

    y as usize * 256 + z as usize * 16 + x as usize
}

fn biome_index(x: u8, y: u8, z: u8) -> usize {
    // Block coordinates truncate into the 4x4x4 biome volume grid.
    let (x, y, z) = (x >> 2, y >> 2, z >> 2);

    y as usize * 16 + z as usize * 4 + x as usize
}

impl ChunkSection {
    /// Creates an all-air section with no biome data at vertical index
    /// `y` (0..16).
    pub fn new(y: u8) -> ChunkSection {
        debug_assert!(16 > y, "Section y index out of bounds");

        let air = BlockState::air();

        ChunkSection {
            y,
            palette: Palette::seeded(air.clone(), SECTION_BLOCK_COUNT),
            blocks: vec![air; SECTION_BLOCK_COUNT],
            biomes: [UNKNOWN_BIOME; SECTION_BIOME_COUNT],
        }
    }

    /// Vertical index of this section inside its column, 0..16.
    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Block state at section-local coordinates (each 0..16).
    pub fn get(&self, x: u8, y: u8, z: u8) -> &BlockState {
        &self.blocks[block_index(x, y, z)]
    }

    /// Replaces the block state at section-local coordinates, keeping the
    /// palette's reference counts in step.
    pub fn set(&mut self, x: u8, y: u8, z: u8, state: BlockState) -> Result<(), PaletteError> {
        let index = block_index(x, y, z);
        let previous = self.blocks[index].clone();

        // Increase before decrease so re-setting the same state never
        // drops it from the palette.
        self.palette.increase(state.clone());
        self.palette.decrease(&previous)?;
        self.blocks[index] = state;

        Ok(())
    }

    /// Biome at section-local block coordinates (each 0..16).
    pub fn get_biome(&self, x: u8, y: u8, z: u8) -> i32 {
        self.biomes[biome_index(x, y, z)]
    }

    /// Sets the biome volume containing the section-local block
    /// coordinates (each 0..16).
    pub fn set_biome(&mut self, x: u8, y: u8, z: u8, biome: i32) {
        self.biomes[biome_index(x, y, z)] = biome;
    }

    /// Whether every slot is implicit air and no biome was set; empty
    /// sections are omitted from the column's section list.
    pub fn is_empty(&self) -> bool {
        self.palette.len() <= 1
            && self.palette.states().first().map_or(true, BlockState::is_air)
            && self.biomes.iter().all(|&biome| biome == UNKNOWN_BIOME)
    }

    /// Width of the packed block-state IDs for a palette of `palette_len`
    /// entries; the game's writer never goes below 4 bits.
    fn block_state_bit_length(palette_len: usize) -> u32 {
        bits::bit_length_for(palette_len).max(4)
    }

    pub fn to_nbt(&self) -> Result<CompoundTag, ColumnError> {
        let mut compound = CompoundTag::new();
        compound.insert_i8("Y", self.y as i8);
        compound.insert("Palette", self.palette.to_nbt());

        // A single-entry palette leaves BlockStates implicit: every slot
        // is ID 0.
        if self.palette.len() > 1 {
            let ids = self.palette.ids_of(&self.blocks)?;
            let words = bits::pack(&ids, Self::block_state_bit_length(self.palette.len()));
            compound.insert_i64_vec("BlockStates", words);
        }

        if self.biomes.iter().any(|&biome| biome != UNKNOWN_BIOME) {
            compound.insert_i32_vec("BiomeArray", self.biomes.to_vec());
        }

        Ok(compound)
    }

    pub fn from_nbt(compound: &CompoundTag) -> Result<ChunkSection, ColumnError> {
        let y = compound.get_i8("Y")?;

        if !(0..16).contains(&y) {
            return Err(ColumnError::InvalidTag {
                tag_name: "Y".to_owned(),
            });
        }

        let mut palette = Palette::from_nbt(compound.get_list("Palette")?)?;

        if palette.is_empty() {
            return Err(ColumnError::InvalidTag {
                tag_name: "Palette".to_owned(),
            });
        }

        let blocks = if palette.len() == 1 {
            vec![palette.states()[0].clone(); SECTION_BLOCK_COUNT]
        } else {
            let words = compound.get_i64_vec("BlockStates")?;
            let bit_length = Self::block_state_bit_length(palette.len());
            let values_per_word = (64 / bit_length) as usize;

            if words.len() < SECTION_BLOCK_COUNT.div_ceil(values_per_word) {
                return Err(ColumnError::InvalidTag {
                    tag_name: "BlockStates".to_owned(),
                });
            }

            bits::unpack(words, bit_length, SECTION_BLOCK_COUNT)
                .into_iter()
                .map(|id| {
                    palette
                        .states()
                        .get(id as usize)
                        .cloned()
                        .ok_or_else(|| ColumnError::InvalidTag {
                            tag_name: "BlockStates".to_owned(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        palette.load_references(blocks.iter())?;

        let biomes = if compound.contains_key("BiomeArray") {
            let values = compound.get_i32_vec("BiomeArray")?;

            <[i32; SECTION_BIOME_COUNT]>::try_from(values).map_err(|_| {
                ColumnError::InvalidTag {
                    tag_name: "BiomeArray".to_owned(),
                }
            })?
        } else {
            [UNKNOWN_BIOME; SECTION_BIOME_COUNT]
        };

        Ok(ChunkSection {
            y: y as u8,
            palette,
            blocks,
            biomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkSection, SECTION_BLOCK_COUNT, UNKNOWN_BIOME};
    use crate::nbt::Tag;
    use crate::palette::BlockState;

    fn stone() -> BlockState {
        BlockState::new("minecraft:stone")
    }

    #[test]
    fn test_new_section_is_empty_air() {
        let section = ChunkSection::new(3);

        assert_eq!(section.y(), 3);
        assert!(section.is_empty());
        assert!(section.get(0, 0, 0).is_air());
        assert!(section.get(15, 15, 15).is_air());
        assert_eq!(section.get_biome(0, 0, 0), UNKNOWN_BIOME);
    }

    #[test]
    fn test_set_updates_palette_references() {
        let mut section = ChunkSection::new(0);

        section.set(1, 2, 3, stone()).unwrap();
        assert_eq!(section.get(1, 2, 3), &stone());
        assert_eq!(section.palette().len(), 2);
        assert!(!section.is_empty());

        // Overwriting the only stone block removes it from the palette.
        section.set(1, 2, 3, BlockState::air()).unwrap();
        assert_eq!(section.palette().len(), 1);
        assert!(section.is_empty());
    }

    #[test]
    fn test_resetting_same_state_keeps_palette_stable() {
        let mut section = ChunkSection::new(0);
        section.set(5, 5, 5, stone()).unwrap();
        section.set(5, 5, 5, stone()).unwrap();

        assert_eq!(section.palette().len(), 2);
        assert_eq!(section.get(5, 5, 5), &stone());
    }

    #[test]
    fn test_biome_volume_truncation() {
        let mut section = ChunkSection::new(0);
        section.set_biome(5, 9, 14, 7);

        // Every block coordinate inside the same 4x4x4 volume reads the
        // same biome.
        assert_eq!(section.get_biome(4, 8, 12), 7);
        assert_eq!(section.get_biome(7, 11, 15), 7);
        assert_eq!(section.get_biome(0, 8, 12), UNKNOWN_BIOME);
        assert!(!section.is_empty());
    }

    #[test]
    fn test_nbt_round_trip() {
        let mut section = ChunkSection::new(7);
        section.set(1, 2, 3, stone()).unwrap();
        section
            .set(0, 0, 0, BlockState::new("minecraft:oak_log").with_property("axis", "y"))
            .unwrap();
        section.set_biome(0, 0, 0, 4);

        let compound = section.to_nbt().unwrap();
        let loaded = ChunkSection::from_nbt(&compound).unwrap();

        assert_eq!(loaded, section);
    }

    #[test]
    fn test_single_state_palette_omits_block_states() {
        let section = ChunkSection::new(0);
        let compound = section.to_nbt().unwrap();

        assert!(!compound.contains_key("BlockStates"));
        assert!(!compound.contains_key("BiomeArray"));

        let loaded = ChunkSection::from_nbt(&compound).unwrap();
        assert_eq!(loaded, section);
    }

    #[test]
    fn test_block_states_width_is_at_least_four_bits() {
        let mut section = ChunkSection::new(0);
        section.set(0, 0, 0, stone()).unwrap();

        let compound = section.to_nbt().unwrap();

        // Two palette entries still pack at 4 bits, 16 values per word.
        match compound.get("BlockStates") {
            Some(Tag::LongArray(words)) => {
                assert_eq!(words.len(), SECTION_BLOCK_COUNT / 16)
            }
            tag => panic!("Expected `TAG_Long_Array` but got `{:?}`", tag),
        }
    }

    #[test]
    fn test_from_nbt_rejects_out_of_range_y() {
        let mut section = ChunkSection::new(0);
        section.set(0, 0, 0, stone()).unwrap();

        let mut compound = section.to_nbt().unwrap();
        compound.insert_i8("Y", 16);

        assert!(ChunkSection::from_nbt(&compound).is_err());
    }

    #[test]
    fn test_from_nbt_rejects_wrong_biome_length() {
        let mut section = ChunkSection::new(0);
        section.set_biome(0, 0, 0, 1);

        let mut compound = section.to_nbt().unwrap();
        compound.insert_i32_vec("BiomeArray", vec![1, 2, 3]);

        assert!(ChunkSection::from_nbt(&compound).is_err());
    }
}
