//! A chunk column: 16 vertical sections plus the Level metadata that is
//! carried through reads and writes untouched.

use crate::error::ColumnError;
use crate::nbt::{CompoundTag, Tag};
use crate::palette::BlockState;
use crate::section::{ChunkSection, UNKNOWN_BIOME};

/// Data version written into new columns.
pub const DATA_VERSION: i32 = 2230;

/// Sections stacked in a column.
pub const COLUMN_SECTION_COUNT: usize = 16;

/// The full record of one chunk: absolute (x, z) chunk coordinates,
/// sections indexed by their vertical position, and preserved metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkColumn {
    x: i32,
    z: i32,
    data_version: i32,
    sections: [Option<ChunkSection>; COLUMN_SECTION_COUNT],
    /// Level tags the core does not model (heightmaps, entities, status,
    /// timing fields, ...), re-emitted verbatim.
    metadata: CompoundTag,
}

fn check_coordinate(coordinate: &'static str, value: i32, bound: i32) -> Result<(), ColumnError> {
    if (0..bound).contains(&value) {
        return Ok(());
    }

    Err(ColumnError::CoordinateOutOfRange { coordinate, value })
}

impl ChunkColumn {
    /// Creates an empty column at absolute chunk coordinates (x, z).
    pub fn new(x: i32, z: i32) -> ChunkColumn {
        ChunkColumn {
            x,
            z,
            data_version: DATA_VERSION,
            sections: Default::default(),
            metadata: CompoundTag::new(),
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn data_version(&self) -> i32 {
        self.data_version
    }

    pub fn section(&self, index: u8) -> Option<&ChunkSection> {
        self.sections[index as usize].as_ref()
    }

    /// Preserved Level metadata.
    pub fn metadata(&self) -> &CompoundTag {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut CompoundTag {
        &mut self.metadata
    }

    /// Block state at chunk-local coordinates: x and z in 0..16, y in
    /// 0..256. Slots in missing sections are implicit air.
    pub fn get_block_state(&self, x: i32, y: i32, z: i32) -> Result<BlockState, ColumnError> {
        check_coordinate("x", x, 16)?;
        check_coordinate("y", y, 256)?;
        check_coordinate("z", z, 16)?;

        match &self.sections[(y >> 4) as usize] {
            Some(section) => Ok(section.get(x as u8, (y & 15) as u8, z as u8).clone()),
            None => Ok(BlockState::air()),
        }
    }

    /// Sets the block state at chunk-local coordinates, creating the
    /// section on first write.
    pub fn set_block_state(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        state: BlockState,
    ) -> Result<(), ColumnError> {
        check_coordinate("x", x, 16)?;
        check_coordinate("y", y, 256)?;
        check_coordinate("z", z, 16)?;

        let section = self.sections[(y >> 4) as usize]
            .get_or_insert_with(|| ChunkSection::new((y >> 4) as u8));

        Ok(section.set(x as u8, (y & 15) as u8, z as u8, state)?)
    }

    /// Biome of the 4x4x4 volume containing the chunk-local coordinates.
    pub fn get_biome(&self, x: i32, y: i32, z: i32) -> Result<i32, ColumnError> {
        check_coordinate("x", x, 16)?;
        check_coordinate("y", y, 256)?;
        check_coordinate("z", z, 16)?;

        match &self.sections[(y >> 4) as usize] {
            Some(section) => Ok(section.get_biome(x as u8, (y & 15) as u8, z as u8)),
            None => Ok(UNKNOWN_BIOME),
        }
    }

    pub fn set_biome(&mut self, x: i32, y: i32, z: i32, biome: i32) -> Result<(), ColumnError> {
        check_coordinate("x", x, 16)?;
        check_coordinate("y", y, 256)?;
        check_coordinate("z", z, 16)?;

        let section = self.sections[(y >> 4) as usize]
            .get_or_insert_with(|| ChunkSection::new((y >> 4) as u8));

        section.set_biome(x as u8, (y & 15) as u8, z as u8, biome);

        Ok(())
    }

    /// Serializes to the root compound: `DataVersion` plus a `Level`
    /// compound with `xPos`, `zPos`, `Sections` (ascending, empty
    /// sections omitted) and the preserved metadata.
    pub fn to_nbt(&self) -> Result<CompoundTag, ColumnError> {
        let mut level = CompoundTag::new();
        level.insert_i32("xPos", self.x);
        level.insert_i32("zPos", self.z);

        let mut sections = Vec::new();

        for section in self.sections.iter().flatten() {
            if !section.is_empty() {
                sections.push(Tag::Compound(section.to_nbt()?));
            }
        }

        level.insert_list("Sections", sections);

        for (name, tag) in self.metadata.iter() {
            level.insert(name, tag.clone());
        }

        let mut root = CompoundTag::new();
        root.insert_i32("DataVersion", self.data_version);
        root.insert_compound_tag("Level", level);

        Ok(root)
    }

    /// Reads a column from a root compound, stowing every Level tag it
    /// does not model for verbatim re-emission.
    pub fn from_nbt(mut root: CompoundTag) -> Result<ChunkColumn, ColumnError> {
        let data_version = if root.contains_key("DataVersion") {
            root.get_i32("DataVersion")?
        } else {
            DATA_VERSION
        };

        let mut level = match root.remove("Level") {
            Some(Tag::Compound(level)) => level,
            Some(_) => {
                return Err(ColumnError::InvalidTag {
                    tag_name: "Level".to_owned(),
                })
            }
            None => {
                return Err(ColumnError::MissingTag {
                    tag_name: "Level".to_owned(),
                })
            }
        };

        let x = level.get_i32("xPos")?;
        let z = level.get_i32("zPos")?;
        level.remove("xPos");
        level.remove("zPos");

        let mut sections: [Option<ChunkSection>; COLUMN_SECTION_COUNT] = Default::default();

        match level.remove("Sections") {
            Some(Tag::List(elements)) => {
                for element in &elements {
                    let compound = match element {
                        Tag::Compound(compound) => compound,
                        _ => {
                            return Err(ColumnError::InvalidTag {
                                tag_name: "Sections".to_owned(),
                            })
                        }
                    };

                    let section = ChunkSection::from_nbt(compound)?;
                    let y = section.y() as usize;
                    sections[y] = Some(section);
                }
            }
            Some(_) => {
                return Err(ColumnError::InvalidTag {
                    tag_name: "Sections".to_owned(),
                })
            }
            None => {}
        }

        Ok(ChunkColumn {
            x,
            z,
            data_version,
            sections,
            metadata: level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkColumn, DATA_VERSION};
    use crate::error::ColumnError;
    use crate::nbt::Tag;
    use crate::palette::BlockState;
    use crate::section::UNKNOWN_BIOME;

    fn stone() -> BlockState {
        BlockState::new("minecraft:stone")
    }

    #[test]
    fn test_new_column_is_implicit_air() {
        let column = ChunkColumn::new(3, -7);

        assert_eq!(column.x(), 3);
        assert_eq!(column.z(), -7);
        assert_eq!(column.data_version(), DATA_VERSION);
        assert!(column.get_block_state(0, 200, 0).unwrap().is_air());
        assert_eq!(column.get_biome(0, 0, 0).unwrap(), UNKNOWN_BIOME);
    }

    #[test]
    fn test_set_creates_section() {
        let mut column = ChunkColumn::new(0, 0);

        assert!(column.section(4).is_none());
        column.set_block_state(1, 66, 3, stone()).unwrap();

        assert!(column.section(4).is_some());
        assert_eq!(column.get_block_state(1, 66, 3).unwrap(), stone());
        assert!(column.get_block_state(1, 65, 3).unwrap().is_air());
    }

    #[test]
    fn test_y_out_of_range() {
        let mut column = ChunkColumn::new(0, 0);

        for y in [-1, 256, 1000] {
            match column.get_block_state(0, y, 0).unwrap_err() {
                ColumnError::CoordinateOutOfRange { coordinate, value } => {
                    assert_eq!(coordinate, "y");
                    assert_eq!(value, y);
                }
                e => panic!("Expected `CoordinateOutOfRange` but got `{:?}`", e),
            }

            assert!(column.set_block_state(0, y, 0, stone()).is_err());
        }
    }

    #[test]
    fn test_local_x_z_out_of_range() {
        let column = ChunkColumn::new(0, 0);

        assert!(column.get_block_state(16, 0, 0).is_err());
        assert!(column.get_block_state(0, 0, -1).is_err());
    }

    #[test]
    fn test_air_sections_dropped_on_serialize() {
        let mut column = ChunkColumn::new(0, 0);
        column.set_block_state(1, 2, 3, stone()).unwrap();
        column.set_block_state(8, 130, 8, stone()).unwrap();

        // Reduce the upper section back to implicit air.
        column
            .set_block_state(8, 130, 8, BlockState::air())
            .unwrap();

        let root = column.to_nbt().unwrap();
        let level = root.get_compound_tag("Level").unwrap();
        let sections = level.get_compound_tag_vec("Sections").unwrap();

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].get_i8("Y").unwrap(), 0);
    }

    #[test]
    fn test_nbt_round_trip_preserves_metadata() {
        let mut column = ChunkColumn::new(2, 5);
        column.set_block_state(1, 2, 3, stone()).unwrap();
        column.set_biome(0, 0, 0, 6).unwrap();

        column.metadata_mut().insert_str("Status", "full");
        column.metadata_mut().insert_i64("InhabitedTime", 1234);
        column.metadata_mut().insert_i64("LastUpdate", 99);
        column
            .metadata_mut()
            .insert_list("TileEntities", Vec::new());

        let root = column.to_nbt().unwrap();
        let loaded = ChunkColumn::from_nbt(root).unwrap();

        assert_eq!(loaded, column);
        assert_eq!(loaded.metadata().get_str("Status").unwrap(), "full");
        assert_eq!(loaded.metadata().get_i64("InhabitedTime").unwrap(), 1234);
    }

    #[test]
    fn test_unknown_level_tags_survive_round_trip() {
        let mut column = ChunkColumn::new(0, 0);
        column
            .metadata_mut()
            .insert("starlight.light_version", Tag::Int(9));

        let root = column.to_nbt().unwrap();
        let loaded = ChunkColumn::from_nbt(root).unwrap();

        assert_eq!(
            loaded.metadata().get("starlight.light_version"),
            Some(&Tag::Int(9))
        );
    }

    #[test]
    fn test_missing_position_tags_rejected() {
        let mut column_nbt = ChunkColumn::new(0, 0).to_nbt().unwrap();

        let mut level = column_nbt.get_compound_tag("Level").unwrap().clone();
        level.remove("xPos");
        column_nbt.insert_compound_tag("Level", level);

        match ChunkColumn::from_nbt(column_nbt).unwrap_err() {
            ColumnError::MissingTag { tag_name } => assert_eq!(tag_name, "xPos"),
            e => panic!("Expected `MissingTag` but got `{:?}`", e),
        }
    }
}
