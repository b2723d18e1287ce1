//! Keeps a property's hospitality mirror (a temporary stay derived from it) in
//! step with the property.
//!
//! The stay's `linkedPropertyId` is the authoritative link. The property's
//! `hospitalityListingId` is a cache of it: linking without a cached id first
//! looks for an existing mirror, and unlinking removes every stay that claims
//! the property.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::ids::IdGenerator;
use crate::models::{
    normalize_list, now, Contact, CostCategory, Property, StayPurpose, StayType, TemporaryStay,
};
use crate::pagination::{Sort, Window};
use crate::predicate::Predicate;
use crate::storage::Transaction;
use crate::users::Actor;

pub const MIRROR_TITLE_SUFFIX: &str = " – Hospitality";

/// What a synchronization did to the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new mirror was created.
    Linked { listing_id: String },
    /// The existing mirror was rewritten from the property.
    Refreshed { listing_id: String },
    /// The mirror (and any other claimer) was removed.
    Unlinked,
    /// Already unlinked; nothing to do.
    Unchanged,
}

#[derive(Clone)]
pub struct HospitalitySync {
    ids: Arc<dyn IdGenerator>,
}

impl HospitalitySync {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        HospitalitySync { ids }
    }

    /// Drives `property` to the requested opt-in state, creating, refreshing or
    /// deleting the mirror inside `tx`. Updates the property's link fields but
    /// does not save the property.
    pub async fn synchronize<T: Transaction>(
        &self,
        tx: &mut T,
        owner: &Actor,
        property: &mut Property,
        opt_in: bool,
    ) -> ServiceResult<SyncOutcome> {
        if opt_in {
            self.link(tx, owner, property).await
        } else {
            self.detach(tx, property).await
        }
    }

    async fn link<T: Transaction>(
        &self,
        tx: &mut T,
        owner: &Actor,
        property: &mut Property,
    ) -> ServiceResult<SyncOutcome> {
        if let Some(listing_id) = property.hospitality_listing_id.clone() {
            let mut mirror = match tx.find_by_id::<TemporaryStay>(&listing_id).await? {
                Some(stay) if stay.linked_property_id.as_deref() == Some(property.id.as_str()) => {
                    stay
                }
                _ => {
                    return Err(ServiceError::ConflictDuringSync {
                        property_id: property.id.clone(),
                        listing_id,
                    })
                }
            };
            project(property, &mut mirror);
            tx.save(&mirror).await?;
            property.hospitality_opt_in = true;
            debug!("refreshed hospitality mirror {} of property {}", listing_id, property.id);
            return Ok(SyncOutcome::Refreshed { listing_id });
        }

        if let Some(mut mirror) = claimers(tx, &property.id).await?.into_iter().next() {
            project(property, &mut mirror);
            tx.save(&mirror).await?;
            let listing_id = mirror.id;
            info!("re-attached hospitality mirror {} to property {}", listing_id, property.id);
            property.hospitality_listing_id = Some(listing_id.clone());
            property.hospitality_opt_in = true;
            return Ok(SyncOutcome::Refreshed { listing_id });
        }

        let mut mirror = TemporaryStay {
            id: self.ids.new_id(),
            manager_id: owner.user_id.clone(),
            title: String::new(),
            description: String::new(),
            kind: StayType::Hosting,
            price_per_night: 0.0,
            min_nights: 1,
            cost_category: CostCategory::Free,
            purpose: StayPurpose::Hospitality,
            location: None,
            contact: None,
            availability: None,
            amenities: Vec::new(),
            images: Vec::new(),
            linked_property_id: None,
            published: true,
            created_at: now(),
        };
        project(property, &mut mirror);
        tx.save(&mirror).await?;
        info!("created hospitality mirror {} for property {}", mirror.id, property.id);
        property.hospitality_listing_id = Some(mirror.id.clone());
        property.hospitality_opt_in = true;
        Ok(SyncOutcome::Linked {
            listing_id: mirror.id,
        })
    }

    /// Removes the mirror and any stay still claiming the property. Missing
    /// records are not an error.
    pub async fn detach<T: Transaction>(
        &self,
        tx: &mut T,
        property: &mut Property,
    ) -> ServiceResult<SyncOutcome> {
        let mut removed = false;
        if let Some(listing_id) = property.hospitality_listing_id.take() {
            if tx.delete::<TemporaryStay>(&listing_id).await? {
                removed = true;
            } else {
                warn!(
                    "hospitality mirror {} of property {} was already gone",
                    listing_id, property.id
                );
            }
        }
        for stray in claimers(tx, &property.id).await? {
            removed |= tx.delete::<TemporaryStay>(&stray.id).await?;
        }
        let was_linked = std::mem::replace(&mut property.hospitality_opt_in, false);
        if removed || was_linked {
            info!("unlinked hospitality for property {}", property.id);
            Ok(SyncOutcome::Unlinked)
        } else {
            Ok(SyncOutcome::Unchanged)
        }
    }
}

async fn claimers<T: Transaction>(tx: &mut T, property_id: &str) -> ServiceResult<Vec<TemporaryStay>> {
    let stays = tx
        .find_window::<TemporaryStay>(
            &Predicate::equals("linkedPropertyId", property_id),
            Sort::Natural,
            Window::all(),
        )
        .await?;
    Ok(stays)
}

/// Overwrites the mirror's derived fields from the property.
fn project(property: &Property, mirror: &mut TemporaryStay) {
    mirror.title = format!("{}{}", property.title, MIRROR_TITLE_SUFFIX);
    mirror.description = property.description.clone();
    mirror.kind = StayType::Hosting;
    mirror.price_per_night = 0.0;
    mirror.min_nights = 1;
    mirror.cost_category = CostCategory::Free;
    mirror.purpose = StayPurpose::Hospitality;
    mirror.location = property.location.clone();
    mirror.contact = property.contact.as_ref().map(|c| Contact {
        name: c.name.clone(),
        phone: c.phone.clone(),
        email: c.email.clone(),
        ..Default::default()
    });
    mirror.amenities = normalize_list(property.features.clone());
    mirror.images = normalize_list(property.images.clone());
    mirror.linked_property_id = Some(property.id.clone());
}
