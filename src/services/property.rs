use log::info;
use serde::Deserialize;

use super::{
    amount, at_least, ensure_owner, require, required_text, schedule, HospitalitySync,
    ServiceDeps, SyncOutcome,
};
use crate::criteria::PropertyCriteria;
use crate::error::ServiceResult;
use crate::models::{
    normalize_list, now, AvailabilitySchedule, Contact, Location, Property, PropertyBasics,
    PropertyType, Role,
};
use crate::pagination::Page;
use crate::storage::{Store, Transaction};
use crate::users::Actor;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
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
    #[serde(default)]
    pub hospitality: bool,
}

/// A partial update: `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePropertyRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<PropertyType>,
    pub price: Option<f64>,
    pub area: Option<f64>,
    pub rooms: Option<i32>,
    pub features: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub basics: Option<PropertyBasics>,
    pub location: Option<Location>,
    pub contact: Option<Contact>,
    pub availability: Option<AvailabilitySchedule>,
    pub hospitality: Option<bool>,
}

pub struct PropertyService<S> {
    deps: ServiceDeps<S>,
    hospitality: HospitalitySync,
}

impl<S: Store> PropertyService<S> {
    pub fn new(deps: ServiceDeps<S>) -> Self {
        let hospitality = HospitalitySync::new(deps.ids.clone());
        PropertyService { deps, hospitality }
    }

    pub async fn search(
        &self,
        criteria: &PropertyCriteria,
        page: i64,
        size: i64,
    ) -> ServiceResult<Page<Property>> {
        self.deps.search(criteria, page, size).await
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreatePropertyRequest,
    ) -> ServiceResult<Property> {
        self.deps
            .authorize(actor, &[Role::Owner], "manage properties")
            .await?;
        let mut property = Property {
            id: self.deps.ids.new_id(),
            owner_id: actor.user_id.clone(),
            title: required_text("title", request.title)?,
            description: required_text("description", request.description)?,
            kind: request.kind,
            price: amount("price", request.price)?,
            area: amount("area", request.area)?,
            rooms: at_least("rooms", request.rooms, 0)?,
            features: normalize_list(request.features),
            images: normalize_list(request.images),
            basics: request.basics,
            location: request.location,
            contact: request.contact,
            availability: schedule(request.availability)?,
            hospitality_opt_in: false,
            hospitality_listing_id: None,
            published: true,
            created_at: now(),
        };

        let mut tx = self.deps.store.begin().await?;
        self.hospitality
            .synchronize(&mut tx, actor, &mut property, request.hospitality)
            .await?;
        tx.save(&property).await?;
        tx.commit().await?;
        info!("created property {} for owner {}", property.id, property.owner_id);
        Ok(property)
    }

    /// Applies `request` and keeps the hospitality mirror in step: an explicit
    /// flag drives the link state, an omitted one refreshes an existing link.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        request: UpdatePropertyRequest,
    ) -> ServiceResult<Property> {
        let mut tx = self.deps.store.begin().await?;
        let mut property: Property = require(&mut tx, id).await?;
        ensure_owner(actor, &property)?;

        let hospitality = request.hospitality;
        apply(&mut property, request)?;
        let desired = hospitality.or(if property.hospitality_opt_in {
            Some(true)
        } else {
            None
        });
        if let Some(opt_in) = desired {
            let outcome = self
                .hospitality
                .synchronize(&mut tx, actor, &mut property, opt_in)
                .await?;
            if let SyncOutcome::Linked { listing_id } = &outcome {
                info!("property {} linked to hospitality stay {}", property.id, listing_id);
            }
        }
        tx.save(&property).await?;
        tx.commit().await?;
        Ok(property)
    }

    /// Deletes the property and its hospitality mirror.
    pub async fn delete(&self, actor: &Actor, id: &str) -> ServiceResult<()> {
        let mut tx = self.deps.store.begin().await?;
        let mut property: Property = require(&mut tx, id).await?;
        ensure_owner(actor, &property)?;
        self.hospitality.detach(&mut tx, &mut property).await?;
        tx.delete::<Property>(id).await?;
        tx.commit().await?;
        info!("deleted property {}", id);
        Ok(())
    }

    pub async fn hide(&self, actor: &Actor, id: &str) -> ServiceResult<Property> {
        self.deps.set_published(actor, id, false).await
    }

    pub async fn publish(&self, actor: &Actor, id: &str) -> ServiceResult<Property> {
        self.deps.set_published(actor, id, true).await
    }

    /// Unpublished properties are only visible to their owner.
    pub async fn get_by_id(&self, id: &str, viewer: Option<&str>) -> ServiceResult<Property> {
        self.deps.get_visible(id, viewer).await
    }

    pub async fn find_recent(&self, limit: usize) -> ServiceResult<Vec<Property>> {
        self.deps.find_recent(limit).await
    }

    pub async fn find_mine(&self, actor: &Actor) -> ServiceResult<Vec<Property>> {
        self.deps
            .authorize(actor, &[Role::Owner], "manage properties")
            .await?;
        self.deps.find_owned(actor).await
    }

    /// Runs the hospitality controller on a stored property and saves the result.
    pub async fn synchronize_hospitality(
        &self,
        actor: &Actor,
        id: &str,
        opt_in: bool,
    ) -> ServiceResult<Property> {
        let mut tx = self.deps.store.begin().await?;
        let mut property: Property = require(&mut tx, id).await?;
        ensure_owner(actor, &property)?;
        self.hospitality
            .synchronize(&mut tx, actor, &mut property, opt_in)
            .await?;
        tx.save(&property).await?;
        tx.commit().await?;
        Ok(property)
    }
}

fn apply(property: &mut Property, request: UpdatePropertyRequest) -> ServiceResult<()> {
    if let Some(title) = request.title {
        property.title = required_text("title", title)?;
    }
    if let Some(description) = request.description {
        property.description = required_text("description", description)?;
    }
    if let Some(kind) = request.kind {
        property.kind = kind;
    }
    if let Some(price) = request.price {
        property.price = amount("price", price)?;
    }
    if let Some(area) = request.area {
        property.area = amount("area", area)?;
    }
    if let Some(rooms) = request.rooms {
        property.rooms = at_least("rooms", rooms, 0)?;
    }
    if let Some(features) = request.features {
        property.features = normalize_list(features);
    }
    if let Some(images) = request.images {
        property.images = normalize_list(images);
    }
    if request.basics.is_some() {
        property.basics = request.basics;
    }
    if request.location.is_some() {
        property.location = request.location;
    }
    if request.contact.is_some() {
        property.contact = request.contact;
    }
    if request.availability.is_some() {
        property.availability = schedule(request.availability)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::error::ServiceError;
    use crate::models::User;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    async fn service() -> (PropertyService<MemoryStore>, Actor) {
        let store = Arc::new(MemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.save(&User {
            id: "owner".into(),
            email: "owner@example.com".into(),
            first_name: "Nikos".into(),
            last_name: "K".into(),
            role: Role::Owner,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
        (
            PropertyService::new(ServiceDeps::with_store(store)),
            Actor::new("owner", Role::Owner),
        )
    }

    fn request(title: &str) -> CreatePropertyRequest {
        CreatePropertyRequest {
            title: title.into(),
            description: "Quiet street".into(),
            kind: PropertyType::Apartment,
            price: 500.0,
            area: 55.0,
            rooms: 2,
            features: vec![" wifi".into(), "wifi".into()],
            images: vec![],
            basics: None,
            location: None,
            contact: None,
            availability: None,
            hospitality: false,
        }
    }

    #[tokio::test]
    async fn create_normalizes_lists() {
        let (service, owner) = service().await;
        let property = service.create(&owner, request("Loft")).await.unwrap();
        assert_eq!(property.features, vec!["wifi"]);
        assert!(property.published);
        assert!(property.hospitality_listing_id.is_none());
    }

    #[tokio::test]
    async fn patch_keeps_omitted_fields() {
        let (service, owner) = service().await;
        let created = service.create(&owner, request("Loft")).await.unwrap();
        let updated = service
            .update(
                &owner,
                &created.id,
                UpdatePropertyRequest {
                    price: Some(650.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, 650.0);
        assert_eq!(updated.title, "Loft");
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn rejects_negative_price() {
        let (service, owner) = service().await;
        let mut bad = request("Loft");
        bad.price = -1.0;
        assert!(matches!(
            service.create(&owner, bad).await,
            Err(ServiceError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn only_stored_owners_may_create() {
        let (service, _) = service().await;
        let mut tx = service.deps.store.begin().await.unwrap();
        tx.save(&User {
            id: "student".into(),
            email: "student@example.com".into(),
            first_name: "Maria".into(),
            last_name: "P".into(),
            role: Role::Student,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let claims_owner = Actor::new("student", Role::Owner);
        assert!(matches!(
            service.create(&claims_owner, request("Loft")).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
