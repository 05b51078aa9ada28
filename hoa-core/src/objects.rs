use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Map object types that can hold a monster stack.
///
/// Only the type tag matters for decoding; the labels are for display.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Monster,
    RandomMonster,
    RandomMonster1,
    RandomMonster2,
    RandomMonster3,
    RandomMonster4,
    RandomMonster5,
    RandomMonster6,
    RandomMonster7,
}

/// Random-monster object types in ascending tag order.
pub const RANDOM_MONSTER_TYPES: [ObjectType; 8] = [
    ObjectType::RandomMonster,
    ObjectType::RandomMonster1,
    ObjectType::RandomMonster2,
    ObjectType::RandomMonster3,
    ObjectType::RandomMonster4,
    ObjectType::RandomMonster5,
    ObjectType::RandomMonster6,
    ObjectType::RandomMonster7,
];

impl ObjectType {
    pub const fn tag(self) -> u32 {
        match self {
            ObjectType::Monster => 54,
            ObjectType::RandomMonster => 71,
            ObjectType::RandomMonster1 => 72,
            ObjectType::RandomMonster2 => 73,
            ObjectType::RandomMonster3 => 74,
            ObjectType::RandomMonster4 => 75,
            ObjectType::RandomMonster5 => 162,
            ObjectType::RandomMonster6 => 163,
            ObjectType::RandomMonster7 => 164,
        }
    }

    /// The little-endian byte pattern searched for in the payload.
    pub const fn signature(self) -> [u8; 4] {
        self.tag().to_le_bytes()
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectType::Monster => "Monster",
            ObjectType::RandomMonster => "Random Monster",
            ObjectType::RandomMonster1 => "Random Monster 1",
            ObjectType::RandomMonster2 => "Random Monster 2",
            ObjectType::RandomMonster3 => "Random Monster 3",
            ObjectType::RandomMonster4 => "Random Monster 4",
            ObjectType::RandomMonster5 => "Random Monster 5",
            ObjectType::RandomMonster6 => "Random Monster 6",
            ObjectType::RandomMonster7 => "Random Monster 7",
        }
    }

    pub fn is_random(self) -> bool {
        self != ObjectType::Monster
    }

    /// Creature level a numbered random monster resolves to. The plain
    /// random monster can roll any level.
    pub fn random_level(self) -> Option<u8> {
        match self {
            ObjectType::RandomMonster1 => Some(1),
            ObjectType::RandomMonster2 => Some(2),
            ObjectType::RandomMonster3 => Some(3),
            ObjectType::RandomMonster4 => Some(4),
            ObjectType::RandomMonster5 => Some(5),
            ObjectType::RandomMonster6 => Some(6),
            ObjectType::RandomMonster7 => Some(7),
            ObjectType::Monster | ObjectType::RandomMonster => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (type {})", self.label(), self.tag())
    }
}

/// How a wandering monster stack reacts to an approaching hero.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    Compliant,
    Friendly,
    #[default]
    Aggressive,
    Hostile,
    Savage,
    Precise,
}

impl Disposition {
    pub const ALL: [Disposition; 6] = [
        Disposition::Compliant,
        Disposition::Friendly,
        Disposition::Aggressive,
        Disposition::Hostile,
        Disposition::Savage,
        Disposition::Precise,
    ];

    /// Byte value stored in the map payload.
    pub const fn code(self) -> u8 {
        match self {
            Disposition::Compliant => 0,
            Disposition::Friendly => 1,
            Disposition::Aggressive => 2,
            Disposition::Hostile => 3,
            Disposition::Savage => 4,
            Disposition::Precise => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Disposition> {
        Disposition::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Disposition::Compliant => "Compliant",
            Disposition::Friendly => "Friendly",
            Disposition::Aggressive => "Aggressive",
            Disposition::Hostile => "Hostile",
            Disposition::Savage => "Savage",
            Disposition::Precise => "Precise",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Disposition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Disposition::from_code(code)
                .ok_or_else(|| format!("unknown disposition code {code}"));
        }
        Disposition::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let names: Vec<&str> = Disposition::ALL.iter().map(|d| d.name()).collect();
                format!("unknown disposition '{trimmed}', expected one of {}", names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_types_are_in_ascending_tag_order() {
        let tags: Vec<u32> = RANDOM_MONSTER_TYPES.iter().map(|t| t.tag()).collect();
        assert_eq!(tags, vec![71, 72, 73, 74, 75, 162, 163, 164]);
    }

    #[test]
    fn monster_signature_is_little_endian() {
        assert_eq!(ObjectType::Monster.signature(), [0x36, 0x00, 0x00, 0x00]);
        assert_eq!(ObjectType::RandomMonster7.signature(), [0xA4, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn aggressive_is_code_two() {
        assert_eq!(Disposition::Aggressive.code(), 2);
        assert_eq!(Disposition::from_code(5), Some(Disposition::Precise));
        assert_eq!(Disposition::from_code(6), None);
    }

    #[test]
    fn parses_disposition_names_and_codes() {
        assert_eq!("hostile".parse::<Disposition>(), Ok(Disposition::Hostile));
        assert_eq!(" Savage ".parse::<Disposition>(), Ok(Disposition::Savage));
        assert_eq!("1".parse::<Disposition>(), Ok(Disposition::Friendly));
        assert!("grumpy".parse::<Disposition>().is_err());
    }
}
