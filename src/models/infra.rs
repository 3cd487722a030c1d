//! Infrastructure categories that can be sited

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of facility a recommendation is computed for.
///
/// Only the first five variants adjust the scoring; everything else is
/// carried verbatim in `Other` and scored with the base formulas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfraType {
    Hospital,
    Clinic,
    Pharmacy,
    School,
    Park,
    Other(String),
}

impl InfraType {
    /// Parse from a free-form request string (case-insensitive)
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let lowered = value.trim().to_lowercase();
        match lowered.as_str() {
            "hospital" => Self::Hospital,
            "clinic" => Self::Clinic,
            "pharmacy" => Self::Pharmacy,
            "school" => Self::School,
            "park" => Self::Park,
            _ => Self::Other(lowered),
        }
    }

    /// Lower-case name as used in requests and cache keys
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hospital => "hospital",
            Self::Clinic => "clinic",
            Self::Pharmacy => "pharmacy",
            Self::School => "school",
            Self::Park => "park",
            Self::Other(name) => name,
        }
    }

    /// OpenStreetMap `amenity=*` value used to look up existing facilities
    #[must_use]
    pub fn amenity_tag(&self) -> &str {
        match self.as_str() {
            "metro" => "train_station",
            "market" => "marketplace",
            other => other,
        }
    }

    /// Whether the medical adjustments apply
    #[must_use]
    pub fn is_medical(&self) -> bool {
        matches!(self, Self::Hospital | Self::Clinic | Self::Pharmacy)
    }
}

impl fmt::Display for InfraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for InfraType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hospital", InfraType::Hospital)]
    #[case("Hospital", InfraType::Hospital)]
    #[case(" SCHOOL ", InfraType::School)]
    #[case("park", InfraType::Park)]
    #[case("clinic", InfraType::Clinic)]
    #[case("pharmacy", InfraType::Pharmacy)]
    #[case("Library", InfraType::Other("library".to_string()))]
    fn test_parse(#[case] input: &str, #[case] expected: InfraType) {
        assert_eq!(InfraType::parse(input), expected);
    }

    #[rstest]
    #[case("hospital", "hospital")]
    #[case("clinic", "clinic")]
    #[case("pharmacy", "pharmacy")]
    #[case("school", "school")]
    #[case("park", "park")]
    #[case("metro", "train_station")]
    #[case("bus_stop", "bus_stop")]
    #[case("market", "marketplace")]
    #[case("fire_station", "fire_station")]
    fn test_amenity_tag(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(InfraType::parse(input).amenity_tag(), expected);
    }

    #[test]
    fn test_medical_group() {
        assert!(InfraType::Hospital.is_medical());
        assert!(InfraType::Pharmacy.is_medical());
        assert!(!InfraType::School.is_medical());
        assert!(!InfraType::Other("clinic_de".to_string()).is_medical());
    }
}
