//! Dimlet identity: `DimletType`, `DimletKey`, and `Feature`
//!
//! These are the closed vocabularies a query is expressed in. Filters match
//! against them; nothing in this module knows about rules.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Closed enumeration of dimlet categories.
///
/// The textual name is lowercase (`"material"`, `"liquid"`, ...). Parsing is
/// case-insensitive so hand-edited rule files may write `"Material"`.
///
/// # Example
///
/// ```
/// use dimrules::DimletType;
///
/// let kind: DimletType = "Material".parse().unwrap();
/// assert_eq!(kind, DimletType::Material);
/// assert_eq!(kind.to_string(), "material");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DimletType {
    /// Biome selection for the dimension.
    Biome,
    /// Biome controller: how biomes are distributed.
    Controller,
    /// A digit used to build dimension ids.
    Digit,
    /// Potion-like effect applied inside the dimension.
    Effect,
    /// Terrain feature such as lakes or caves.
    Feature,
    /// Fog color.
    Fog,
    /// A fluid block used in terrain generation.
    Liquid,
    /// A solid block used in terrain generation.
    Material,
    /// A mob that spawns in the dimension.
    Mob,
    /// Supporter cosmetic.
    Patreon,
    /// Sky color and sky bodies.
    Sky,
    /// Special modifiers such as peaceful or efficiency.
    Special,
    /// Generated structure.
    Structure,
    /// Base terrain generator.
    Terrain,
    /// Fixed time of day and day length.
    Time,
    /// Weather override.
    Weather,
}

impl DimletType {
    /// Every dimlet type, in declaration order.
    pub const ALL: [DimletType; 16] = [
        Self::Biome,
        Self::Controller,
        Self::Digit,
        Self::Effect,
        Self::Feature,
        Self::Fog,
        Self::Liquid,
        Self::Material,
        Self::Mob,
        Self::Patreon,
        Self::Sky,
        Self::Special,
        Self::Structure,
        Self::Terrain,
        Self::Time,
        Self::Weather,
    ];

    /// The lowercase name used in rule files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Biome => "biome",
            Self::Controller => "controller",
            Self::Digit => "digit",
            Self::Effect => "effect",
            Self::Feature => "feature",
            Self::Fog => "fog",
            Self::Liquid => "liquid",
            Self::Material => "material",
            Self::Mob => "mob",
            Self::Patreon => "patreon",
            Self::Sky => "sky",
            Self::Special => "special",
            Self::Structure => "structure",
            Self::Terrain => "terrain",
            Self::Time => "time",
            Self::Weather => "weather",
        }
    }
}

impl fmt::Display for DimletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DimletType {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName::new("dimlet type", s, Self::ALL.map(Self::name)))
    }
}

/// Identifies one concrete dimlet: its category plus an identifier such as
/// `"minecraft:stone"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimletKey {
    kind: DimletType,
    id: String,
}

impl DimletKey {
    /// Create a key for the given type and identifier.
    pub fn new(kind: DimletType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// The dimlet category.
    #[must_use]
    pub fn kind(&self) -> DimletType {
        self.kind
    }

    /// The identifier within the category.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DimletKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A capability flag carried by a query and required by a filter's
/// `features` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    /// The block is not a full cube.
    NoFullBlock,
    /// The block carries a tile entity.
    TileEntity,
    /// The block can be planted.
    Plantable,
    /// The block falls when unsupported.
    Falling,
}

impl Feature {
    /// Every feature, in declaration order.
    pub const ALL: [Feature; 4] = [
        Self::NoFullBlock,
        Self::TileEntity,
        Self::Plantable,
        Self::Falling,
    ];

    /// The lowercase name used in rule files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NoFullBlock => "nofullblock",
            Self::TileEntity => "tileentity",
            Self::Plantable => "plantable",
            Self::Falling => "falling",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feat| feat.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName::new("feature", s, Self::ALL.map(Self::name)))
    }
}

/// The active feature set of a query. Ordered so serialized output is stable.
pub type FeatureSet = BTreeSet<Feature>;

/// A name that is not part of a closed vocabulary.
///
/// Carries the accepted names so the message tells the user what to write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} \"{name}\", expected one of: {}", .expected.join(", "))]
pub struct UnknownName {
    what: &'static str,
    name: String,
    expected: Vec<&'static str>,
}

impl UnknownName {
    fn new<const N: usize>(what: &'static str, name: &str, expected: [&'static str; N]) -> Self {
        Self {
            what,
            name: name.to_owned(),
            expected: expected.to_vec(),
        }
    }
}
