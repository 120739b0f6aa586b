use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::ActorContext;

use crate::models::{
    PatientError, PatientProfile, PatientSearchQuery, ProfileCompleteness, UpsertProfileRequest,
};
use crate::services::store::PatientStore;

pub struct PatientService {
    store: Arc<dyn PatientStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    pub async fn get_own(&self, actor: &ActorContext) -> Result<PatientProfile, PatientError> {
        self.store
            .by_user(&actor.user_id, actor.token())
            .await?
            .ok_or(PatientError::NotFound)
    }

    /// Creates the caller's profile on first save, merges into it afterwards.
    pub async fn upsert_own(
        &self,
        request: UpsertProfileRequest,
        actor: &ActorContext,
    ) -> Result<PatientProfile, PatientError> {
        request.validate()?;

        let profile = match self.store.by_user(&actor.user_id, actor.token()).await? {
            Some(mut existing) => {
                request.apply_to(&mut existing);
                existing
            }
            None => {
                debug!("Creating patient profile for user {}", actor.user_id);
                request.into_profile(&actor.user_id, actor.email.clone())?
            }
        };

        let saved = self.store.save(profile, actor.token()).await?;
        info!("Saved profile {} for user {} (complete: {})",
              saved.id, actor.user_id, saved.is_complete());
        Ok(saved)
    }

    pub async fn completeness(&self, actor: &ActorContext) -> Result<ProfileCompleteness, PatientError> {
        let profile = self.store.by_user(&actor.user_id, actor.token()).await?;
        Ok(ProfileCompleteness::of(profile.as_ref()))
    }

    /// The caller's profile, refused unless it is complete enough to book with.
    pub async fn require_bookable(&self, actor: &ActorContext) -> Result<PatientProfile, PatientError> {
        let profile = self.store.by_user(&actor.user_id, actor.token()).await?;
        let completeness = ProfileCompleteness::of(profile.as_ref());

        match profile {
            Some(profile) if completeness.complete => Ok(profile),
            _ => {
                warn!("User {} tried to book with an incomplete profile: {:?}",
                      actor.user_id, completeness.missing);
                Err(PatientError::ProfileIncomplete { missing: completeness.missing })
            }
        }
    }

    /// Admins read any profile; patients only their own.
    pub async fn get(&self, id: Uuid, actor: &ActorContext) -> Result<PatientProfile, PatientError> {
        let profile = self.store
            .get(id, actor.token())
            .await?
            .ok_or(PatientError::NotFound)?;

        if !actor.is_admin() && profile.user_id != actor.user_id {
            return Err(PatientError::Unauthorized);
        }
        Ok(profile)
    }

    pub async fn search(
        &self,
        query: PatientSearchQuery,
        actor: &ActorContext,
    ) -> Result<Vec<PatientProfile>, PatientError> {
        if !actor.is_admin() {
            return Err(PatientError::Unauthorized);
        }
        debug!("Searching patients with query: {:?}", query);
        self.store.search(&query, actor.token()).await
    }
}
