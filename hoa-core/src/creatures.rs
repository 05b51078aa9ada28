use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{EditorError, Result};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub name: String,
    pub ai_value: u32,
}

/// Creature names and AI values indexed by creature id.
///
/// Built once at startup and handed to the scanner by reference; its length
/// is the validity bound for concrete monster ids.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatureTable {
    creatures: Vec<Creature>,
}

// Town creatures come in blocks of 14 (7 levels, base + upgrade).
const TOWN_CREATURE_COUNT: usize = 112;
const TOWN_BLOCK: usize = 14;

const AI_LEVEL_THRESHOLDS: [u32; 6] = [100, 200, 400, 800, 1600, 3200];

// (name, AI value) by creature id.
const BUILTIN_CREATURES: &[(&str, u32)] = &[
    // Castle
    ("Pikeman", 80),
    ("Halberdier", 115),
    ("Archer", 126),
    ("Marksman", 184),
    ("Griffin", 351),
    ("Royal Griffin", 448),
    ("Swordsman", 445),
    ("Crusader", 588),
    ("Monk", 485),
    ("Zealot", 750),
    ("Cavalier", 1946),
    ("Champion", 2100),
    ("Angel", 5019),
    ("Archangel", 6033),
    // Rampart
    ("Centaur", 100),
    ("Centaur Captain", 138),
    ("Dwarf", 138),
    ("Battle Dwarf", 209),
    ("Wood Elf", 234),
    ("Grand Elf", 331),
    ("Pegasus", 518),
    ("Silver Pegasus", 532),
    ("Dendroid Guard", 517),
    ("Dendroid Soldier", 803),
    ("Unicorn", 1806),
    ("War Unicorn", 2030),
    ("Green Dragon", 4872),
    ("Gold Dragon", 8613),
    // Tower
    ("Gremlin", 44),
    ("Master Gremlin", 66),
    ("Stone Gargoyle", 165),
    ("Obsidian Gargoyle", 201),
    ("Stone Golem", 250),
    ("Iron Golem", 412),
    ("Mage", 570),
    ("Arch Mage", 680),
    ("Genie", 884),
    ("Master Genie", 942),
    ("Naga", 2016),
    ("Naga Queen", 2840),
    ("Giant", 3718),
    ("Titan", 7500),
    // Inferno
    ("Imp", 50),
    ("Familiar", 60),
    ("Gog", 159),
    ("Magog", 240),
    ("Hell Hound", 357),
    ("Cerberus", 392),
    ("Demon", 445),
    ("Horned Demon", 480),
    ("Pit Fiend", 765),
    ("Pit Lord", 1224),
    ("Efreeti", 1670),
    ("Efreet Sultan", 2343),
    ("Devil", 5101),
    ("Arch Devil", 7115),
    // Necropolis
    ("Skeleton", 60),
    ("Skeleton Warrior", 85),
    ("Walking Dead", 98),
    ("Zombie", 128),
    ("Wight", 252),
    ("Wraith", 315),
    ("Vampire", 555),
    ("Vampire Lord", 783),
    ("Lich", 848),
    ("Power Lich", 1079),
    ("Black Knight", 2087),
    ("Dread Knight", 2382),
    ("Bone Dragon", 3388),
    ("Ghost Dragon", 4696),
    // Dungeon
    ("Troglodyte", 59),
    ("Infernal Troglodyte", 84),
    ("Harpy", 154),
    ("Harpy Hag", 238),
    ("Beholder", 336),
    ("Evil Eye", 367),
    ("Medusa", 517),
    ("Medusa Queen", 577),
    ("Minotaur", 835),
    ("Minotaur King", 1068),
    ("Manticore", 1547),
    ("Scorpicore", 1589),
    ("Red Dragon", 4702),
    ("Black Dragon", 8721),
    // Stronghold
    ("Goblin", 60),
    ("Hobgoblin", 78),
    ("Wolf Rider", 130),
    ("Wolf Raider", 203),
    ("Orc", 192),
    ("Orc Chieftain", 240),
    ("Ogre", 416),
    ("Ogre Mage", 672),
    ("Roc", 1027),
    ("Thunderbird", 1106),
    ("Cyclops", 1266),
    ("Cyclops King", 1443),
    ("Behemoth", 3162),
    ("Ancient Behemoth", 6168),
    // Fortress
    ("Gnoll", 56),
    ("Gnoll Marauder", 90),
    ("Lizardman", 126),
    ("Lizard Warrior", 156),
    ("Gorgon", 890),
    ("Mighty Gorgon", 1028),
    ("Serpent Fly", 268),
    ("Dragon Fly", 312),
    ("Basilisk", 552),
    ("Greater Basilisk", 714),
    ("Wyvern", 1350),
    ("Wyvern Monarch", 1518),
    ("Hydra", 4120),
    ("Chaos Hydra", 5931),
    // Conflux and neutrals
    ("Air Elemental", 356),
    ("Earth Elemental", 330),
    ("Fire Elemental", 345),
    ("Water Elemental", 315),
    ("Gold Golem", 600),
    ("Diamond Golem", 775),
    ("Pixie", 55),
    ("Sprite", 95),
    ("Psychic Elemental", 1431),
    ("Magic Elemental", 2012),
    ("Not Used (1)", 0),
    ("Ice Elemental", 380),
    ("Not Used (2)", 0),
    ("Magma Elemental", 490),
    ("Not Used (3)", 0),
    ("Storm Elemental", 486),
    ("Not Used (4)", 0),
    ("Energy Elemental", 470),
    ("Firebird", 4547),
    ("Phoenix", 6721),
    ("Azure Dragon", 78845),
    ("Crystal Dragon", 39338),
    ("Faerie Dragon", 19580),
    ("Rust Dragon", 26433),
    ("Enchanter", 1210),
    ("Sharpshooter", 585),
    ("Halfling", 75),
    ("Peasant", 15),
    ("Boar", 145),
    ("Mummy", 270),
    ("Nomad", 345),
    ("Rogue", 135),
    ("Troll", 1024),
];

impl CreatureTable {
    pub fn new(creatures: Vec<Creature>) -> Result<Self> {
        let table = Self { creatures };
        if table.is_empty() {
            return Err(EditorError::Config(
                "creature table must contain at least one creature".to_string(),
            ));
        }
        Ok(table)
    }

    /// The stock creature table shipped with the editor.
    pub fn builtin() -> Self {
        let creatures = BUILTIN_CREATURES
            .iter()
            .map(|&(name, ai_value)| Creature {
                name: name.to_string(),
                ai_value,
            })
            .collect();
        Self { creatures }
    }

    /// Loads a replacement table from a JSON array of `{ "name", "ai_value" }`.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let creatures: Vec<Creature> = serde_json::from_str(&content)?;
        Self::new(creatures)
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    pub fn contains(&self, id: u16) -> bool {
        (id as usize) < self.creatures.len()
    }

    pub fn get(&self, id: u16) -> Option<&Creature> {
        self.creatures.get(id as usize)
    }

    pub fn name(&self, id: u16) -> Option<&str> {
        self.get(id).map(|c| c.name.as_str())
    }

    /// Creature level 1..=7. Town creatures follow their dwelling tier,
    /// everything else is estimated from its AI value.
    pub fn level(&self, id: u16) -> Option<u8> {
        let creature = self.get(id)?;
        let idx = id as usize;
        if idx < TOWN_CREATURE_COUNT {
            return Some(((idx % TOWN_BLOCK) / 2 + 1) as u8);
        }
        let below = AI_LEVEL_THRESHOLDS
            .iter()
            .position(|&limit| creature.ai_value < limit)
            .unwrap_or(AI_LEVEL_THRESHOLDS.len());
        Some(below as u8 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_stock_ids() {
        let table = CreatureTable::builtin();
        assert_eq!(table.len(), 145);
        assert_eq!(table.name(0), Some("Pikeman"));
        assert_eq!(table.name(83), Some("Black Dragon"));
        assert_eq!(table.name(144), Some("Troll"));
        assert!(table.contains(144));
        assert!(!table.contains(145));
    }

    #[test]
    fn town_levels_follow_dwelling_tier() {
        let table = CreatureTable::builtin();
        assert_eq!(table.level(0), Some(1));
        assert_eq!(table.level(13), Some(7));
        assert_eq!(table.level(76), Some(4)); // Medusa
        assert_eq!(table.level(111), Some(7));
    }

    #[test]
    fn neutral_levels_come_from_ai_value() {
        let table = CreatureTable::builtin();
        assert_eq!(table.level(139), Some(1)); // Peasant, 15
        assert_eq!(table.level(140), Some(2)); // Boar, 145
        assert_eq!(table.level(112), Some(3)); // Air Elemental, 356
        assert_eq!(table.level(132), Some(7)); // Azure Dragon
        assert_eq!(table.level(145), None);
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            CreatureTable::new(Vec::new()),
            Err(EditorError::Config(_))
        ));
    }
}
