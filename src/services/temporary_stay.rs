use log::info;
use serde::Deserialize;

use super::{
    amount, at_least, ensure_owner, require, required_text, schedule, ServiceDeps,
};
use crate::criteria::TemporaryStayCriteria;
use crate::error::ServiceResult;
use crate::models::{
    normalize_list, now, AvailabilitySchedule, Contact, CostCategory, Location, Role,
    StayPurpose, StayType, TemporaryStay,
};
use crate::pagination::Page;
use crate::storage::{Store, Transaction};
use crate::users::Actor;

const MANAGERS: &[Role] = &[Role::Owner, Role::Regular];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemporaryStayRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: StayType,
    pub price_per_night: f64,
    pub min_nights: i32,
    pub cost_category: CostCategory,
    pub purpose: Option<StayPurpose>,
    pub location: Option<Location>,
    pub contact: Option<Contact>,
    pub availability: Option<AvailabilitySchedule>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateTemporaryStayRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<StayType>,
    pub price_per_night: Option<f64>,
    pub min_nights: Option<i32>,
    pub cost_category: Option<CostCategory>,
    pub purpose: Option<StayPurpose>,
    pub location: Option<Location>,
    pub contact: Option<Contact>,
    pub availability: Option<AvailabilitySchedule>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

pub struct TemporaryStayService<S> {
    deps: ServiceDeps<S>,
}

impl<S: Store> TemporaryStayService<S> {
    pub fn new(deps: ServiceDeps<S>) -> Self {
        TemporaryStayService { deps }
    }

    pub async fn search(
        &self,
        criteria: &TemporaryStayCriteria,
        page: i64,
        size: i64,
    ) -> ServiceResult<Page<TemporaryStay>> {
        self.deps.search(criteria, page, size).await
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateTemporaryStayRequest,
    ) -> ServiceResult<TemporaryStay> {
        self.authorize(actor).await?;
        let stay = TemporaryStay {
            id: self.deps.ids.new_id(),
            manager_id: actor.user_id.clone(),
            title: required_text("title", request.title)?,
            description: required_text("description", request.description)?,
            kind: request.kind,
            price_per_night: amount("pricePerNight", request.price_per_night)?,
            min_nights: at_least("minNights", request.min_nights, 1)?,
            cost_category: request.cost_category,
            purpose: request.purpose.unwrap_or_default(),
            location: request.location,
            contact: request.contact,
            availability: schedule(request.availability)?,
            amenities: normalize_list(request.amenities),
            images: normalize_list(request.images),
            linked_property_id: None,
            published: true,
            created_at: now(),
        };
        let mut tx = self.deps.store.begin().await?;
        tx.save(&stay).await?;
        tx.commit().await?;
        info!("created temporary stay {} for manager {}", stay.id, stay.manager_id);
        Ok(stay)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        request: UpdateTemporaryStayRequest,
    ) -> ServiceResult<TemporaryStay> {
        self.authorize(actor).await?;
        let mut tx = self.deps.store.begin().await?;
        let mut stay: TemporaryStay = require(&mut tx, id).await?;
        ensure_owner(actor, &stay)?;
        apply(&mut stay, request)?;
        tx.save(&stay).await?;
        tx.commit().await?;
        Ok(stay)
    }

    pub async fn delete(&self, actor: &Actor, id: &str) -> ServiceResult<()> {
        self.authorize(actor).await?;
        let mut tx = self.deps.store.begin().await?;
        let stay: TemporaryStay = require(&mut tx, id).await?;
        ensure_owner(actor, &stay)?;
        tx.delete::<TemporaryStay>(id).await?;
        tx.commit().await?;
        info!("deleted temporary stay {}", id);
        Ok(())
    }

    pub async fn hide(&self, actor: &Actor, id: &str) -> ServiceResult<TemporaryStay> {
        self.authorize(actor).await?;
        self.deps.set_published(actor, id, false).await
    }

    pub async fn publish(&self, actor: &Actor, id: &str) -> ServiceResult<TemporaryStay> {
        self.authorize(actor).await?;
        self.deps.set_published(actor, id, true).await
    }

    pub async fn get_by_id(&self, id: &str, viewer: Option<&str>) -> ServiceResult<TemporaryStay> {
        self.deps.get_visible(id, viewer).await
    }

    pub async fn find_recent(&self, limit: usize) -> ServiceResult<Vec<TemporaryStay>> {
        self.deps.find_recent(limit).await
    }

    pub async fn find_mine(&self, actor: &Actor) -> ServiceResult<Vec<TemporaryStay>> {
        self.authorize(actor).await?;
        self.deps.find_owned(actor).await
    }

    /// Stays are managed by owners and regular users only.
    async fn authorize(&self, actor: &Actor) -> ServiceResult<()> {
        self.deps
            .authorize(actor, MANAGERS, "manage temporary stays")
            .await?;
        Ok(())
    }
}

fn apply(stay: &mut TemporaryStay, request: UpdateTemporaryStayRequest) -> ServiceResult<()> {
    if let Some(title) = request.title {
        stay.title = required_text("title", title)?;
    }
    if let Some(description) = request.description {
        stay.description = required_text("description", description)?;
    }
    if let Some(kind) = request.kind {
        stay.kind = kind;
    }
    if let Some(price) = request.price_per_night {
        stay.price_per_night = amount("pricePerNight", price)?;
    }
    if let Some(nights) = request.min_nights {
        stay.min_nights = at_least("minNights", nights, 1)?;
    }
    if let Some(category) = request.cost_category {
        stay.cost_category = category;
    }
    if let Some(purpose) = request.purpose {
        stay.purpose = purpose;
    }
    if request.location.is_some() {
        stay.location = request.location;
    }
    if request.contact.is_some() {
        stay.contact = request.contact;
    }
    if request.availability.is_some() {
        stay.availability = schedule(request.availability)?;
    }
    if let Some(amenities) = request.amenities {
        stay.amenities = normalize_list(amenities);
    }
    if let Some(images) = request.images {
        stay.images = normalize_list(images);
    }
    Ok(())
}
