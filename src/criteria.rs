//! Search criteria for each listing family and their translation into predicates.
//!
//! Every field is optional. A populated field adds exactly one clause; the
//! clauses are ANDed onto the `published = true` base. Criteria are advisory:
//! blank strings, empty lists and non-finite numbers are ignored, and a range
//! whose maximum is below its minimum is dropped entirely.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::{CostCategory, PropertyType, StayPurpose, StayType};
use crate::predicate::{Expr, Predicate};

/// Maps a criteria object to the clauses it contributes.
pub trait Criteria {
    fn clauses(&self) -> Vec<Predicate>;

    /// The full public-search predicate: `published = true` AND every clause.
    fn to_predicate(&self) -> Predicate {
        Predicate::all_of(Predicate::published(), self.clauses())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyCriteria {
    pub types: Vec<PropertyType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_rooms: Option<i32>,
    pub city: Option<String>,
    pub furnished: Option<bool>,
    pub has_damage: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemporaryStayCriteria {
    pub types: Vec<StayType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub city: Option<String>,
    pub cost_category: Option<CostCategory>,
    pub amenities: Vec<String>,
    pub purpose: Option<StayPurpose>,
    pub linked_property_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoommateCriteria {
    pub min_rent: Option<f64>,
    pub max_rent: Option<f64>,
    pub city: Option<String>,
    pub available_from: Option<NaiveDate>,
    pub student_only: Option<bool>,
    pub interests: Vec<String>,
    pub amenities: Vec<String>,
}

impl Criteria for PropertyCriteria {
    fn clauses(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        if !self.types.is_empty() {
            out.push(Predicate::any_of(
                "type",
                self.types.iter().map(|t| t.as_str()),
            ));
        }
        push_range(&mut out, "price", self.min_price, self.max_price);
        push_range(&mut out, "area", self.min_area, self.max_area);
        if let Some(rooms) = self.min_rooms {
            out.push(Predicate::gte("rooms", rooms));
        }
        if let Some(city) = text(&self.city) {
            out.push(Predicate::contains("location.city", city));
        }
        if let Some(furnished) = self.furnished {
            out.push(Predicate::equals("basics.furnished", furnished));
        }
        if let Some(has_damage) = self.has_damage {
            out.push(Predicate::equals("basics.hasDamage", has_damage));
        }
        if let Some(term) = text(&self.search) {
            out.push(free_text(term));
        }
        out
    }
}

impl Criteria for TemporaryStayCriteria {
    fn clauses(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        if !self.types.is_empty() {
            out.push(Predicate::any_of(
                "type",
                self.types.iter().map(|t| t.as_str()),
            ));
        }
        push_range(&mut out, "pricePerNight", self.min_price, self.max_price);
        if let Some(city) = text(&self.city) {
            out.push(Predicate::contains("location.city", city));
        }
        if let Some(category) = self.cost_category {
            out.push(Predicate::equals("costCategory", category.as_str()));
        }
        if let Some(purpose) = self.purpose {
            out.push(Predicate::equals("purpose", purpose.as_str()));
        }
        if let Some(values) = tags(&self.amenities) {
            out.push(Predicate::any_of("amenities", values));
        }
        if let Some(property_id) = text(&self.linked_property_id) {
            out.push(Predicate::equals("linkedPropertyId", property_id));
        }
        out
    }
}

impl Criteria for RoommateCriteria {
    fn clauses(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        push_range(&mut out, "monthlyRent", self.min_rent, self.max_rent);
        if let Some(city) = text(&self.city) {
            out.push(Predicate::contains("location.city", city));
        }
        if let Some(date) = self.available_from {
            // ads without a date are open-ended
            out.push(Expr::or(
                Predicate::missing("availableFrom"),
                Predicate::lte("availableFrom", date.format("%Y-%m-%d").to_string()),
            ));
        }
        if self.student_only == Some(true) {
            out.push(Predicate::equals("profile.student", true));
        }
        if let Some(values) = tags(&self.amenities) {
            out.push(Predicate::any_of("amenities", values));
        }
        if let Some(values) = tags(&self.interests) {
            out.push(Predicate::any_of("lifestyle", values));
        }
        out
    }
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn tags(values: &[String]) -> Option<Vec<&str>> {
    let cleaned: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn free_text(term: &str) -> Predicate {
    Expr::or(
        Predicate::contains("title", term),
        Predicate::contains("description", term),
    )
}

fn push_range(out: &mut Vec<Predicate>, path: &'static str, min: Option<f64>, max: Option<f64>) {
    let min = min.filter(|v| v.is_finite());
    let max = max.filter(|v| v.is_finite());
    if let (Some(lo), Some(hi)) = (min, max) {
        if hi < lo {
            debug!("ignoring inverted {} range [{}, {}]", path, lo, hi);
            return;
        }
    }
    if let Some(lo) = min {
        out.push(Predicate::gte(path, lo));
    }
    if let Some(hi) = max {
        out.push(Predicate::lte(path, hi));
    }
}
