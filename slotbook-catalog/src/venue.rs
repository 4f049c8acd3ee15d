use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use crate::CatalogError;

/// A bookable venue (stadium, court, turf...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub facilities: Vec<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Venue {
    pub fn new(owner_id: Uuid, new: NewVenue) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            location: new.location.trim().to_string(),
            description: new.description.filter(|d| !d.trim().is_empty()),
            facilities: new.facilities,
            owner_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn summary(&self) -> VenueSummary {
        VenueSummary {
            id: self.id,
            name: self.name.clone(),
            location: self.location.clone(),
        }
    }
}

/// Facilities arrive either as a list or as the comma-separated text an admin typed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FacilitiesInput {
    List(Vec<String>),
    Text(String),
}

impl Default for FacilitiesInput {
    fn default() -> Self {
        FacilitiesInput::List(Vec::new())
    }
}

impl FacilitiesInput {
    /// Trimmed, non-empty entries in input order
    pub fn normalize(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            FacilitiesInput::List(items) => items,
            FacilitiesInput::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        raw.iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVenue {
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    #[serde(default)]
    pub facilities: Vec<String>,
}

impl NewVenue {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::Validation("venue name is required".to_string()));
        }
        if self.location.trim().is_empty() {
            return Err(CatalogError::Validation("venue location is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VenueSummary {
    pub id: Uuid,
    pub name: String,
    pub location: String,
}

/// Case-insensitive substring filters used by venue and slot search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueFilter {
    pub name_contains: Option<String>,
    pub location_contains: Option<String>,
}

impl VenueFilter {
    pub fn matches(&self, venue: &Venue) -> bool {
        contains_ci(&venue.name, self.name_contains.as_deref())
            && contains_ci(&venue.location, self.location_contains.as_deref())
    }
}

/// Case-insensitive substring match; a blank needle matches everything
pub fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(name: &str, location: &str) -> Venue {
        Venue::new(Uuid::new_v4(), NewVenue {
            name: name.to_string(),
            location: location.to_string(),
            description: None,
            facilities: vec![],
        })
    }

    #[test]
    fn test_facilities_from_text_are_trimmed() {
        let input: FacilitiesInput = serde_json::from_str("\"Floodlights, Parking ,, Showers \"").unwrap();
        assert_eq!(input.normalize(), vec!["Floodlights", "Parking", "Showers"]);
    }

    #[test]
    fn test_facilities_from_list() {
        let input: FacilitiesInput = serde_json::from_str(r#"["Nets", " ", "Cafe"]"#).unwrap();
        assert_eq!(input.normalize(), vec!["Nets", "Cafe"]);
    }

    #[test]
    fn test_new_venue_requires_name_and_location() {
        let mut new = NewVenue {
            name: "  ".to_string(),
            location: "Pune".to_string(),
            description: None,
            facilities: vec![],
        };
        assert!(new.validate().is_err());

        new.name = "Green Turf".to_string();
        assert!(new.validate().is_ok());

        new.location = String::new();
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_venue_filter_is_case_insensitive() {
        let v = venue("Green Turf Arena", "Koramangala, Bengaluru");

        let filter = VenueFilter { name_contains: Some("turf".into()), location_contains: None };
        assert!(filter.matches(&v));

        let filter = VenueFilter { name_contains: None, location_contains: Some("BENGALURU".into()) };
        assert!(filter.matches(&v));

        let filter = VenueFilter { name_contains: Some("stadium".into()), location_contains: None };
        assert!(!filter.matches(&v));

        assert!(VenueFilter::default().matches(&v));
    }

    #[test]
    fn test_contains_ci_ignores_blank_needles() {
        assert!(contains_ci("Riverside", None));
        assert!(contains_ci("Riverside", Some("   ")));
        assert!(contains_ci("Riverside", Some(" SIDE ")));
        assert!(!contains_ci("Riverside", Some("hill")));
    }
}
