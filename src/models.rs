use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Record;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            /// The value stored in the database for this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }
    };
}

wire_enum!(Role {
    Student => "STUDENT",
    Owner => "OWNER",
    Regular => "REGULAR",
});

wire_enum!(PropertyType {
    Apartment => "APARTMENT",
    Studio => "STUDIO",
    House => "HOUSE",
    Roommate => "ROOMMATE",
    Sale => "SALE",
});

wire_enum!(StayType {
    Hotel => "HOTEL",
    Room => "ROOM",
    Airbnb => "AIRBNB",
    Hostel => "HOSTEL",
    Hosting => "HOSTING",
});

wire_enum!(CostCategory {
    Free => "FREE",
    Paid => "PAID",
});

wire_enum!(
    /// Why a temporary stay exists: a regular offer, or the mirror of a property.
    StayPurpose {
        Accommodation => "ACCOMMODATION",
        Hospitality => "HOSPITALITY",
    }
);

wire_enum!(RoommateMode {
    HostSeekingRoommate => "HOST_SEEKING_ROOMMATE",
    FindingHomeWithRoommate => "FINDING_HOME_WITH_ROOMMATE",
    LookingForRoom => "LOOKING_FOR_ROOM",
    VacancyNeedsRoommate => "VACANCY_NEEDS_ROOMMATE",
});

wire_enum!(FavoriteKind {
    Property => "PROPERTY",
    RoommateAd => "ROOMMATE_AD",
    TemporaryStay => "TEMPORARY_STAY",
});

impl Default for RoommateMode {
    fn default() -> Self {
        RoommateMode::HostSeekingRoommate
    }
}

impl Default for StayPurpose {
    fn default() -> Self {
        StayPurpose::Accommodation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub instagram: Option<String>,
    pub facebook: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyBasics {
    pub furnished: Option<bool>,
    pub has_damage: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySchedule {
    #[serde(default)]
    pub unavailable: Vec<AvailabilityWindow>,
    pub note: Option<String>,
    pub calendar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub price: f64,
    pub area: f64,
    pub rooms: i32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub basics: Option<PropertyBasics>,
    pub location: Option<Location>,
    pub contact: Option<Contact>,
    pub availability: Option<AvailabilitySchedule>,
    pub hospitality_opt_in: bool,
    /// Cached pointer to the mirror stay; `TemporaryStay::linked_property_id` is authoritative.
    pub hospitality_listing_id: Option<String>,
    pub published: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryStay {
    #[serde(rename = "_id")]
    pub id: String,
    pub manager_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: StayType,
    pub price_per_night: f64,
    pub min_nights: i32,
    pub cost_category: CostCategory,
    #[serde(default)]
    pub purpose: StayPurpose,
    pub location: Option<Location>,
    pub contact: Option<Contact>,
    pub availability: Option<AvailabilitySchedule>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub linked_property_id: Option<String>,
    pub published: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoommateProfile {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub university: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub student: Option<bool>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub habits: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoommateLocation {
    pub city: Option<String>,
    pub area: Option<String>,
    pub proximity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoommateAd {
    #[serde(rename = "_id")]
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub description: String,
    pub monthly_rent: f64,
    pub property_location: Option<String>,
    #[serde(default)]
    pub mode: RoommateMode,
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub property_features: Vec<String>,
    #[serde(default)]
    pub lifestyle: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub profile: Option<RoommateProfile>,
    pub location: Option<RoommateLocation>,
    pub contact: Option<Contact>,
    pub availability: Option<AvailabilitySchedule>,
    pub published: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoommateRating {
    #[serde(rename = "_id")]
    pub id: String,
    pub ad_id: String,
    pub reviewer_id: String,
    pub reviewer_name: Option<String>,
    pub score: i32,
    pub comment: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: FavoriteKind,
    pub target_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Property {
    const COLLECTION: &'static str = "properties";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for TemporaryStay {
    const COLLECTION: &'static str = "temporary_stays";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for RoommateAd {
    const COLLECTION: &'static str = "roommate_ads";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for RoommateRating {
    const COLLECTION: &'static str = "roommate_ratings";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Favorite {
    const COLLECTION: &'static str = "favorites";
    fn id(&self) -> &str {
        &self.id
    }
}

/// The current time at the millisecond precision the database keeps.
pub fn now() -> DateTime<Utc> {
    bson::DateTime::now().to_chrono()
}

/// Trims entries, drops blanks and repeats, keeping first-seen order.
pub fn normalize_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|seen| seen == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        let as_bson = bson::to_bson(&StayPurpose::Hospitality).unwrap();
        assert_eq!(as_bson.as_str(), Some(StayPurpose::Hospitality.as_str()));
        let as_bson = bson::to_bson(&RoommateMode::VacancyNeedsRoommate).unwrap();
        assert_eq!(as_bson.as_str(), Some("VACANCY_NEEDS_ROOMMATE"));
    }

    #[test]
    fn property_document_uses_camel_case_paths() {
        let property = Property {
            id: "p1".into(),
            owner_id: "u1".into(),
            title: "Loft".into(),
            description: "Bright".into(),
            kind: PropertyType::Studio,
            price: 500.0,
            area: 40.0,
            rooms: 1,
            features: vec![],
            images: vec![],
            basics: Some(PropertyBasics {
                furnished: Some(true),
                has_damage: None,
            }),
            location: None,
            contact: None,
            availability: None,
            hospitality_opt_in: false,
            hospitality_listing_id: None,
            published: true,
            created_at: Utc::now(),
        };
        let doc = bson::to_document(&property).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), "p1");
        assert_eq!(doc.get_str("type").unwrap(), "STUDIO");
        assert!(doc.get_datetime("createdAt").is_ok());
        assert_eq!(
            doc.get_document("basics").unwrap().get_bool("furnished").unwrap(),
            true
        );
    }

    #[test]
    fn normalize_list_trims_and_dedups() {
        let out = normalize_list(vec![
            " wifi ".into(),
            "".into(),
            "parking".into(),
            "wifi".into(),
            "   ".into(),
        ]);
        assert_eq!(out, vec!["wifi".to_string(), "parking".to_string()]);
    }
}
