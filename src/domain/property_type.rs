use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Listing families. A rendered URL only ever carries types of one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    Residential,
    Commercial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResidentialType {
    Apartment,
    Townhouse,
    VillaCompound,
    Land,
    Building,
    Villa,
    Penthouse,
    HotelApartment,
    Floor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommercialType {
    Office,
    Warehouse,
    Villa,
    Land,
    Building,
    IndustrialLand,
    Showroom,
    Shop,
    LabourCamp,
    BulkUnit,
    Floor,
    Factory,
    MixedUseLand,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", content = "type", rename_all = "kebab-case")]
pub enum PropertyType {
    Residential(ResidentialType),
    Commercial(CommercialType),
}

impl PropertyType {
    pub fn family(self) -> Family {
        match self {
            Self::Residential(_) => Family::Residential,
            Self::Commercial(_) => Family::Commercial,
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Residential(t) => write!(f, "residential {t:?}"),
            Self::Commercial(t) => write!(f, "commercial {t:?}"),
        }
    }
}

/// A property type as named in free text, before the query is assigned a
/// family. `Villa`, `Land`, `Building` and `Floor` exist in both families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeMention {
    Apartment,
    Townhouse,
    VillaCompound,
    Penthouse,
    HotelApartment,
    Villa,
    Land,
    Building,
    Floor,
    Office,
    Warehouse,
    IndustrialLand,
    Showroom,
    Shop,
    LabourCamp,
    BulkUnit,
    Factory,
    MixedUseLand,
}

impl TypeMention {
    /// The only family this mention can belong to, or `None` when ambiguous.
    pub fn home_family(self) -> Option<Family> {
        match self {
            Self::Apartment
            | Self::Townhouse
            | Self::VillaCompound
            | Self::Penthouse
            | Self::HotelApartment => Some(Family::Residential),
            Self::Villa | Self::Land | Self::Building | Self::Floor => None,
            Self::Office
            | Self::Warehouse
            | Self::IndustrialLand
            | Self::Showroom
            | Self::Shop
            | Self::LabourCamp
            | Self::BulkUnit
            | Self::Factory
            | Self::MixedUseLand => Some(Family::Commercial),
        }
    }

    pub fn in_family(self, family: Family) -> Option<PropertyType> {
        match family {
            Family::Residential => {
                let t = match self {
                    Self::Apartment => ResidentialType::Apartment,
                    Self::Townhouse => ResidentialType::Townhouse,
                    Self::VillaCompound => ResidentialType::VillaCompound,
                    Self::Penthouse => ResidentialType::Penthouse,
                    Self::HotelApartment => ResidentialType::HotelApartment,
                    Self::Villa => ResidentialType::Villa,
                    Self::Land => ResidentialType::Land,
                    Self::Building => ResidentialType::Building,
                    Self::Floor => ResidentialType::Floor,
                    _ => return None,
                };
                Some(PropertyType::Residential(t))
            }
            Family::Commercial => {
                let t = match self {
                    Self::Villa => CommercialType::Villa,
                    Self::Land => CommercialType::Land,
                    Self::Building => CommercialType::Building,
                    Self::Floor => CommercialType::Floor,
                    Self::Office => CommercialType::Office,
                    Self::Warehouse => CommercialType::Warehouse,
                    Self::IndustrialLand => CommercialType::IndustrialLand,
                    Self::Showroom => CommercialType::Showroom,
                    Self::Shop => CommercialType::Shop,
                    Self::LabourCamp => CommercialType::LabourCamp,
                    Self::BulkUnit => CommercialType::BulkUnit,
                    Self::Factory => CommercialType::Factory,
                    Self::MixedUseLand => CommercialType::MixedUseLand,
                    _ => return None,
                };
                Some(PropertyType::Commercial(t))
            }
        }
    }
}

// Alternation order matters: at a shared start position the regex engine
// takes the first alternative, so compound names precede their head word.
const MENTION_FRAGMENTS: &[(&str, TypeMention)] = &[
    (r"villa[\s-]+compounds?", TypeMention::VillaCompound),
    (r"villas?", TypeMention::Villa),
    (r"hotel[\s-]+apartments?", TypeMention::HotelApartment),
    (r"apartments?|flats?", TypeMention::Apartment),
    (r"town[\s-]?houses?", TypeMention::Townhouse),
    (r"penthouses?", TypeMention::Penthouse),
    (r"industrial[\s-]+(?:lands?|plots?)", TypeMention::IndustrialLand),
    (r"mixed[\s-]+use[\s-]+(?:lands?|plots?)", TypeMention::MixedUseLand),
    (r"lands?|plots?", TypeMention::Land),
    (r"buildings?", TypeMention::Building),
    (r"floors?", TypeMention::Floor),
    (r"offices?", TypeMention::Office),
    (r"warehouses?", TypeMention::Warehouse),
    (r"show[\s-]?rooms?", TypeMention::Showroom),
    (r"shops?", TypeMention::Shop),
    (r"labou?r[\s-]+camps?", TypeMention::LabourCamp),
    (r"bulk[\s-]+units?", TypeMention::BulkUnit),
    (r"factory|factories", TypeMention::Factory),
];

static MENTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = MENTION_FRAGMENTS
        .iter()
        .map(|(fragment, _)| format!("({fragment})"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("type mention pattern is valid")
});

/// Every type mention in `text`, in order of appearance, first mention only.
pub fn find_mentions(text: &str) -> Vec<TypeMention> {
    let mut found = Vec::new();
    for caps in MENTION_PATTERN.captures_iter(text) {
        let mention = MENTION_FRAGMENTS
            .iter()
            .enumerate()
            .find(|(i, _)| caps.get(i + 1).is_some())
            .map(|(_, (_, mention))| *mention);
        if let Some(mention) = mention
            && !found.contains(&mention)
        {
            found.push(mention);
        }
    }
    found
}
