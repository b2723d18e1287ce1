use log::debug;

use super::{require, ServiceDeps};
use crate::error::ServiceResult;
use crate::models::{now, Favorite, FavoriteKind, Property, RoommateAd, TemporaryStay};
use crate::pagination::{Sort, Window};
use crate::predicate::{Expr, Predicate};
use crate::storage::{Store, Transaction};
use crate::users::Actor;

pub struct FavoriteService<S> {
    deps: ServiceDeps<S>,
}

impl<S: Store> FavoriteService<S> {
    pub fn new(deps: ServiceDeps<S>) -> Self {
        FavoriteService { deps }
    }

    /// Adds the target to the actor's favourites, or removes it when already
    /// there. Returns whether it is a favourite afterwards.
    pub async fn toggle(
        &self,
        actor: &Actor,
        kind: FavoriteKind,
        target_id: &str,
    ) -> ServiceResult<bool> {
        self.deps.authorize(actor, &[], "keep favourites").await?;
        let mut tx = self.deps.store.begin().await?;
        match kind {
            FavoriteKind::Property => {
                require::<Property, _>(&mut tx, target_id).await?;
            }
            FavoriteKind::RoommateAd => {
                require::<RoommateAd, _>(&mut tx, target_id).await?;
            }
            FavoriteKind::TemporaryStay => {
                require::<TemporaryStay, _>(&mut tx, target_id).await?;
            }
        }

        let existing = tx
            .find_window::<Favorite>(
                &Expr::and(
                    of_user(actor, Some(kind)),
                    Predicate::equals("targetId", target_id),
                ),
                Sort::Natural,
                Window::all(),
            )
            .await?;
        let favorite = if existing.is_empty() {
            tx.save(&Favorite {
                id: self.deps.ids.new_id(),
                user_id: actor.user_id.clone(),
                kind,
                target_id: target_id.to_string(),
                created_at: now(),
            })
            .await?;
            true
        } else {
            for favorite in &existing {
                tx.delete::<Favorite>(&favorite.id).await?;
            }
            false
        };
        tx.commit().await?;
        debug!(
            "favourite {} {} for user {}: {}",
            kind.as_str(),
            target_id,
            actor.user_id,
            favorite
        );
        Ok(favorite)
    }

    /// The actor's favourites, newest first, optionally of one kind.
    pub async fn list(&self, actor: &Actor, kind: Option<FavoriteKind>) -> ServiceResult<Vec<Favorite>> {
        self.deps.authorize(actor, &[], "keep favourites").await?;
        let mut tx = self.deps.store.begin_read().await?;
        let favorites = tx
            .find_window::<Favorite>(&of_user(actor, kind), Sort::Recent, Window::all())
            .await?;
        Ok(favorites)
    }
}

fn of_user(actor: &Actor, kind: Option<FavoriteKind>) -> Predicate {
    let user = Predicate::equals("userId", actor.user_id.clone());
    match kind {
        Some(kind) => Expr::and(user, Predicate::equals("type", kind.as_str())),
        None => user,
    }
}
