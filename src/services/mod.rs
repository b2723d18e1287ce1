//! Listing services. Every mutation takes the acting user explicitly and runs in
//! one store transaction; an error anywhere drops the transaction uncommitted.

use std::sync::Arc;

use log::debug;

use crate::criteria::Criteria;
use crate::error::{ServiceError, ServiceResult};
use crate::ids::{IdGenerator, NanoIds};
use crate::models::{AvailabilitySchedule, Property, Role, RoommateAd, TemporaryStay, User};
use crate::pagination::{self, Page, PageRequest, Sort, Window};
use crate::predicate::Predicate;
use crate::storage::{Record, Store, Transaction};
use crate::users::{Actor, StoreUsers, UserLookup};

pub mod favorite;
pub mod hospitality;
pub mod property;
pub mod roommate;
pub mod temporary_stay;

pub use favorite::FavoriteService;
pub use hospitality::{HospitalitySync, SyncOutcome};
pub use property::{CreatePropertyRequest, PropertyService, UpdatePropertyRequest};
pub use roommate::{
    CreateRoommateAdRequest, RatedRoommateAd, RatingRequest, RoommateService,
    UpdateRoommateAdRequest,
};
pub use temporary_stay::{
    CreateTemporaryStayRequest, TemporaryStayService, UpdateTemporaryStayRequest,
};

/// A record with an owner and a visibility flag.
pub trait Listing: Record + Clone {
    /// Human-readable name used in error messages.
    const KIND: &'static str;
    /// Document path holding the owner's id.
    const OWNER_PATH: &'static str;

    fn owner_id(&self) -> &str;
    fn is_published(&self) -> bool;
    fn set_published(&mut self, published: bool);
}

impl Listing for Property {
    const KIND: &'static str = "property";
    const OWNER_PATH: &'static str = "ownerId";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
    fn is_published(&self) -> bool {
        self.published
    }
    fn set_published(&mut self, published: bool) {
        self.published = published;
    }
}

impl Listing for TemporaryStay {
    const KIND: &'static str = "temporary stay";
    const OWNER_PATH: &'static str = "managerId";

    fn owner_id(&self) -> &str {
        &self.manager_id
    }
    fn is_published(&self) -> bool {
        self.published
    }
    fn set_published(&mut self, published: bool) {
        self.published = published;
    }
}

impl Listing for RoommateAd {
    const KIND: &'static str = "roommate ad";
    const OWNER_PATH: &'static str = "authorId";

    fn owner_id(&self) -> &str {
        &self.author_id
    }
    fn is_published(&self) -> bool {
        self.published
    }
    fn set_published(&mut self, published: bool) {
        self.published = published;
    }
}

/// Collaborators shared by every service.
pub struct ServiceDeps<S> {
    pub store: Arc<S>,
    pub users: Arc<dyn UserLookup>,
    pub ids: Arc<dyn IdGenerator>,
}

impl<S> Clone for ServiceDeps<S> {
    fn clone(&self) -> Self {
        ServiceDeps {
            store: Arc::clone(&self.store),
            users: Arc::clone(&self.users),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<S: Store> ServiceDeps<S> {
    pub fn new(store: Arc<S>, users: Arc<dyn UserLookup>, ids: Arc<dyn IdGenerator>) -> Self {
        ServiceDeps { store, users, ids }
    }

    /// Users resolved from the same store, nanoid identifiers.
    pub fn with_store(store: Arc<S>) -> Self {
        let users = Arc::new(StoreUsers::new(Arc::clone(&store)));
        ServiceDeps::new(store, users, Arc::new(NanoIds))
    }

    /// Loads the acting user and checks the stored role, not the one the actor
    /// claims; an empty `roles` admits anyone.
    pub(crate) async fn authorize(
        &self,
        actor: &Actor,
        roles: &[Role],
        action: &str,
    ) -> ServiceResult<User> {
        let user = self.users.find_user(&actor.user_id).await?;
        if user.role != actor.role {
            debug!(
                "user {} acts as {} but is stored as {}",
                user.id,
                actor.role.as_str(),
                user.role.as_str()
            );
        }
        if !roles.is_empty() && !roles.contains(&user.role) {
            return Err(ServiceError::forbidden(format!(
                "role {} may not {}",
                user.role.as_str(),
                action
            )));
        }
        Ok(user)
    }

    pub(crate) async fn get_visible<L: Listing>(
        &self,
        id: &str,
        viewer: Option<&str>,
    ) -> ServiceResult<L> {
        let mut tx = self.store.begin_read().await?;
        let listing: L = require(&mut tx, id).await?;
        if listing.is_published() || viewer == Some(listing.owner_id()) {
            Ok(listing)
        } else {
            Err(not_found::<L>(id))
        }
    }

    pub(crate) async fn set_published<L: Listing>(
        &self,
        actor: &Actor,
        id: &str,
        published: bool,
    ) -> ServiceResult<L> {
        let mut tx = self.store.begin().await?;
        let mut listing: L = require(&mut tx, id).await?;
        ensure_owner(actor, &listing)?;
        listing.set_published(published);
        tx.save(&listing).await?;
        tx.commit().await?;
        Ok(listing)
    }

    pub(crate) async fn search<L: Listing>(
        &self,
        criteria: &impl Criteria,
        page: i64,
        size: i64,
    ) -> ServiceResult<Page<L>> {
        let predicate = criteria.to_predicate();
        let request = PageRequest::new(page, size);
        debug!("searching {} page {} size {}", L::COLLECTION, request.page(), request.size());
        let mut tx = self.store.begin_read().await?;
        let result =
            pagination::execute_page::<L, _>(&mut tx, &predicate, request, Sort::Natural).await?;
        Ok(result)
    }

    pub(crate) async fn find_recent<L: Listing>(&self, limit: usize) -> ServiceResult<Vec<L>> {
        let mut tx = self.store.begin_read().await?;
        Ok(pagination::find_recent::<L, _>(&mut tx, limit).await?)
    }

    /// Everything the actor owns, published or not, newest first.
    pub(crate) async fn find_owned<L: Listing>(&self, actor: &Actor) -> ServiceResult<Vec<L>> {
        let mut tx = self.store.begin_read().await?;
        let owned = tx
            .find_window::<L>(
                &Predicate::equals(L::OWNER_PATH, actor.user_id.clone()),
                Sort::Recent,
                Window::all(),
            )
            .await?;
        Ok(owned)
    }
}

/// Loads a listing or fails with `NotFound`.
pub(crate) async fn require<L: Listing, T: Transaction>(tx: &mut T, id: &str) -> ServiceResult<L> {
    tx.find_by_id::<L>(id)
        .await?
        .ok_or_else(|| not_found::<L>(id))
}

pub(crate) fn not_found<L: Listing>(id: &str) -> ServiceError {
    ServiceError::not_found(format!("{} {}", L::KIND, id))
}

pub(crate) fn ensure_owner<L: Listing>(actor: &Actor, listing: &L) -> ServiceResult<()> {
    if listing.owner_id() == actor.user_id {
        Ok(())
    } else {
        Err(ServiceError::forbidden(format!(
            "user {} does not own {} {}",
            actor.user_id,
            L::KIND,
            listing.id()
        )))
    }
}

pub(crate) fn required_text(field: &str, value: String) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid(format!("{} must not be blank", field)));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn amount(field: &str, value: f64) -> ServiceResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ServiceError::invalid(format!(
            "{} must be a non-negative number",
            field
        )))
    }
}

pub(crate) fn at_least(field: &str, value: i32, min: i32) -> ServiceResult<i32> {
    if value >= min {
        Ok(value)
    } else {
        Err(ServiceError::invalid(format!("{} must be at least {}", field, min)))
    }
}

pub(crate) fn schedule(
    value: Option<AvailabilitySchedule>,
) -> ServiceResult<Option<AvailabilitySchedule>> {
    if let Some(schedule) = &value {
        if let Some(window) = schedule
            .unavailable
            .iter()
            .find(|w| w.end_date < w.start_date)
        {
            return Err(ServiceError::invalid(format!(
                "availability window ends ({}) before it starts ({})",
                window.end_date, window.start_date
            )));
        }
    }
    Ok(value)
}

/// The four listing services over one store.
pub struct Services<S> {
    pub properties: PropertyService<S>,
    pub stays: TemporaryStayService<S>,
    pub roommates: RoommateService<S>,
    pub favorites: FavoriteService<S>,
}

impl<S: Store> Services<S> {
    pub fn new(deps: ServiceDeps<S>) -> Self {
        Services {
            properties: PropertyService::new(deps.clone()),
            stays: TemporaryStayService::new(deps.clone()),
            roommates: RoommateService::new(deps.clone()),
            favorites: FavoriteService::new(deps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AvailabilityWindow;
    use chrono::NaiveDate;

    #[test]
    fn text_is_trimmed_and_required() {
        assert_eq!(required_text("title", "  Loft ".into()).unwrap(), "Loft");
        assert!(matches!(
            required_text("title", "   ".into()),
            Err(ServiceError::ValidationFailed(_))
        ));
    }

    #[test]
    fn amounts_must_be_finite_and_non_negative() {
        assert_eq!(amount("price", 0.0).unwrap(), 0.0);
        assert!(amount("price", -1.0).is_err());
        assert!(amount("price", f64::INFINITY).is_err());
        assert!(amount("price", f64::NAN).is_err());
    }

    #[test]
    fn inverted_availability_windows_are_rejected() {
        let window = |start: u32, end: u32| AvailabilityWindow {
            start_date: NaiveDate::from_ymd_opt(2024, 7, start).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 7, end).unwrap(),
            label: None,
        };
        let ok = AvailabilitySchedule {
            unavailable: vec![window(1, 1), window(3, 9)],
            ..Default::default()
        };
        assert!(schedule(Some(ok)).is_ok());
        let bad = AvailabilitySchedule {
            unavailable: vec![window(9, 3)],
            ..Default::default()
        };
        assert!(schedule(Some(bad)).is_err());
        assert!(schedule(None).unwrap().is_none());
    }
}
