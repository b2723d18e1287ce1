use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::{amount, ensure_owner, require, required_text, schedule, ServiceDeps};
use crate::criteria::RoommateCriteria;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    normalize_list, now, AvailabilitySchedule, Contact, RoommateAd, RoommateLocation,
    RoommateMode, RoommateProfile, RoommateRating,
};
use crate::pagination::{Page, Sort, Window};
use crate::predicate::Predicate;
use crate::storage::{Store, Transaction};
use crate::users::Actor;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoommateAdRequest {
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
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateRoommateAdRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub monthly_rent: Option<f64>,
    pub property_location: Option<String>,
    pub mode: Option<RoommateMode>,
    pub available_from: Option<NaiveDate>,
    pub preferences: Option<Vec<String>>,
    pub property_features: Option<Vec<String>>,
    pub lifestyle: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    pub profile: Option<RoommateProfile>,
    pub location: Option<RoommateLocation>,
    pub contact: Option<Contact>,
    pub availability: Option<AvailabilitySchedule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    pub score: i32,
    pub comment: Option<String>,
}

/// A roommate ad together with its ratings, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedRoommateAd {
    #[serde(flatten)]
    pub ad: RoommateAd,
    pub ratings: Vec<RoommateRating>,
    pub rating_count: usize,
    /// Mean score rounded to one decimal, `None` while unrated.
    pub average_rating: Option<f64>,
    pub last_rated_at: Option<DateTime<Utc>>,
}

impl RatedRoommateAd {
    pub fn new(ad: RoommateAd, ratings: Vec<RoommateRating>) -> Self {
        let average_rating = if ratings.is_empty() {
            None
        } else {
            let total: i64 = ratings.iter().map(|r| i64::from(r.score)).sum();
            let mean = total as f64 / ratings.len() as f64;
            Some((mean * 10.0).round() / 10.0)
        };
        RatedRoommateAd {
            ad,
            rating_count: ratings.len(),
            average_rating,
            last_rated_at: ratings.iter().map(|r| r.created_at).max(),
            ratings,
        }
    }
}

pub struct RoommateService<S> {
    deps: ServiceDeps<S>,
}

impl<S: Store> RoommateService<S> {
    pub fn new(deps: ServiceDeps<S>) -> Self {
        RoommateService { deps }
    }

    pub async fn search(
        &self,
        criteria: &RoommateCriteria,
        page: i64,
        size: i64,
    ) -> ServiceResult<Page<RoommateAd>> {
        self.deps.search(criteria, page, size).await
    }

    /// Any registered user may post a roommate ad.
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateRoommateAdRequest,
    ) -> ServiceResult<RoommateAd> {
        self.deps.authorize(actor, &[], "post roommate ads").await?;
        let ad = RoommateAd {
            id: self.deps.ids.new_id(),
            author_id: actor.user_id.clone(),
            title: required_text("title", request.title)?,
            description: required_text("description", request.description)?,
            monthly_rent: amount("monthlyRent", request.monthly_rent)?,
            property_location: request.property_location,
            mode: request.mode,
            available_from: request.available_from,
            preferences: normalize_list(request.preferences),
            property_features: normalize_list(request.property_features),
            lifestyle: normalize_list(request.lifestyle),
            images: normalize_list(request.images),
            amenities: normalize_list(request.amenities),
            profile: request.profile.map(normalize_profile),
            location: request.location,
            contact: request.contact,
            availability: schedule(request.availability)?,
            published: true,
            created_at: now(),
        };
        let mut tx = self.deps.store.begin().await?;
        tx.save(&ad).await?;
        tx.commit().await?;
        info!("created roommate ad {} for author {}", ad.id, ad.author_id);
        Ok(ad)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        request: UpdateRoommateAdRequest,
    ) -> ServiceResult<RoommateAd> {
        let mut tx = self.deps.store.begin().await?;
        let mut ad: RoommateAd = require(&mut tx, id).await?;
        ensure_owner(actor, &ad)?;
        apply(&mut ad, request)?;
        tx.save(&ad).await?;
        tx.commit().await?;
        Ok(ad)
    }

    /// Deletes the ad together with its ratings.
    pub async fn delete(&self, actor: &Actor, id: &str) -> ServiceResult<()> {
        let mut tx = self.deps.store.begin().await?;
        let ad: RoommateAd = require(&mut tx, id).await?;
        ensure_owner(actor, &ad)?;
        let ratings = tx
            .find_window::<RoommateRating>(&ratings_of(id), Sort::Natural, Window::all())
            .await?;
        for rating in &ratings {
            tx.delete::<RoommateRating>(&rating.id).await?;
        }
        tx.delete::<RoommateAd>(id).await?;
        tx.commit().await?;
        info!("deleted roommate ad {} and {} ratings", id, ratings.len());
        Ok(())
    }

    pub async fn hide(&self, actor: &Actor, id: &str) -> ServiceResult<RoommateAd> {
        self.deps.set_published(actor, id, false).await
    }

    pub async fn publish(&self, actor: &Actor, id: &str) -> ServiceResult<RoommateAd> {
        self.deps.set_published(actor, id, true).await
    }

    /// The ad with its ratings. Hidden ads are only visible to their author.
    pub async fn get_by_id(
        &self,
        id: &str,
        viewer: Option<&str>,
    ) -> ServiceResult<RatedRoommateAd> {
        let ad: RoommateAd = self.deps.get_visible(id, viewer).await?;
        let mut tx = self.deps.store.begin_read().await?;
        let ratings = tx
            .find_window::<RoommateRating>(&ratings_of(&ad.id), Sort::Recent, Window::all())
            .await?;
        Ok(RatedRoommateAd::new(ad, ratings))
    }

    pub async fn find_recent(&self, limit: usize) -> ServiceResult<Vec<RoommateAd>> {
        self.deps.find_recent(limit).await
    }

    pub async fn find_mine(&self, actor: &Actor) -> ServiceResult<Vec<RoommateAd>> {
        self.deps.authorize(actor, &[], "post roommate ads").await?;
        self.deps.find_owned(actor).await
    }

    pub async fn add_rating(
        &self,
        actor: &Actor,
        ad_id: &str,
        request: RatingRequest,
    ) -> ServiceResult<RoommateRating> {
        let reviewer = self.deps.authorize(actor, &[], "rate roommate ads").await?;
        if !(1..=5).contains(&request.score) {
            return Err(ServiceError::invalid("score must be between 1 and 5"));
        }
        let mut tx = self.deps.store.begin().await?;
        let ad: RoommateAd = require(&mut tx, ad_id).await?;
        if ad.author_id == actor.user_id {
            return Err(ServiceError::forbidden("you cannot rate your own listing"));
        }
        let rating = RoommateRating {
            id: self.deps.ids.new_id(),
            ad_id: ad.id,
            reviewer_id: reviewer.id,
            reviewer_name: display_name(&reviewer.first_name, &reviewer.last_name),
            score: request.score,
            comment: request
                .comment
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            created_at: now(),
        };
        tx.save(&rating).await?;
        tx.commit().await?;
        Ok(rating)
    }

    /// Ratings of an ad, newest first.
    pub async fn ratings(&self, ad_id: &str) -> ServiceResult<Vec<RoommateRating>> {
        let mut tx = self.deps.store.begin_read().await?;
        let ad: RoommateAd = require(&mut tx, ad_id).await?;
        let ratings = tx
            .find_window::<RoommateRating>(&ratings_of(&ad.id), Sort::Recent, Window::all())
            .await?;
        Ok(ratings)
    }
}

fn ratings_of(ad_id: &str) -> Predicate {
    Predicate::equals("adId", ad_id)
}

fn display_name(first: &str, last: &str) -> Option<String> {
    let name = format!("{} {}", first.trim(), last.trim());
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn normalize_profile(mut profile: RoommateProfile) -> RoommateProfile {
    profile.interests = normalize_list(profile.interests);
    profile.habits = normalize_list(profile.habits);
    profile
}

fn apply(ad: &mut RoommateAd, request: UpdateRoommateAdRequest) -> ServiceResult<()> {
    if let Some(title) = request.title {
        ad.title = required_text("title", title)?;
    }
    if let Some(description) = request.description {
        ad.description = required_text("description", description)?;
    }
    if let Some(rent) = request.monthly_rent {
        ad.monthly_rent = amount("monthlyRent", rent)?;
    }
    if request.property_location.is_some() {
        ad.property_location = request.property_location;
    }
    if let Some(mode) = request.mode {
        ad.mode = mode;
    }
    if request.available_from.is_some() {
        ad.available_from = request.available_from;
    }
    if let Some(values) = request.preferences {
        ad.preferences = normalize_list(values);
    }
    if let Some(values) = request.property_features {
        ad.property_features = normalize_list(values);
    }
    if let Some(values) = request.lifestyle {
        ad.lifestyle = normalize_list(values);
    }
    if let Some(values) = request.images {
        ad.images = normalize_list(values);
    }
    if let Some(values) = request.amenities {
        ad.amenities = normalize_list(values);
    }
    if let Some(profile) = request.profile {
        ad.profile = Some(normalize_profile(profile));
    }
    if request.location.is_some() {
        ad.location = request.location;
    }
    if request.contact.is_some() {
        ad.contact = request.contact;
    }
    if request.availability.is_some() {
        ad.availability = schedule(request.availability)?;
    }
    Ok(())
}
