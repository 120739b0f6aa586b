// libs/clinic-cell/src/services/catalog.rs
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::ActorContext;

use crate::models::{
    CatalogError, Clinic, CreateClinicRequest, CreateServiceRequest, Service,
    UpdateClinicRequest, UpdateServiceRequest,
};
use crate::services::store::{ClinicStore, ServiceStore};

/// Clinics and bookable services. Anyone signed in can read; only admins write.
pub struct CatalogService {
    clinics: Arc<dyn ClinicStore>,
    services: Arc<dyn ServiceStore>,
}

impl CatalogService {
    pub fn new(clinics: Arc<dyn ClinicStore>, services: Arc<dyn ServiceStore>) -> Self {
        Self { clinics, services }
    }

    fn require_admin(actor: &ActorContext) -> Result<(), CatalogError> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(CatalogError::Unauthorized)
        }
    }

    // ==========================================================================
    // CLINICS
    // ==========================================================================

    pub async fn list_clinics(&self, actor: &ActorContext) -> Result<Vec<Clinic>, CatalogError> {
        self.clinics.list(actor.token()).await
    }

    pub async fn get_clinic(&self, id: Uuid, actor: &ActorContext) -> Result<Clinic, CatalogError> {
        self.clinics
            .get(id, actor.token())
            .await?
            .ok_or(CatalogError::ClinicNotFound)
    }

    pub async fn create_clinic(
        &self,
        request: CreateClinicRequest,
        actor: &ActorContext,
    ) -> Result<Clinic, CatalogError> {
        Self::require_admin(actor)?;
        request.validate()?;

        let clinic = self.clinics
            .insert(request.into_clinic(Uuid::new_v4()), actor.token())
            .await?;
        info!("Clinic {} created by {}", clinic.id, actor.user_id);
        Ok(clinic)
    }

    pub async fn update_clinic(
        &self,
        id: Uuid,
        request: UpdateClinicRequest,
        actor: &ActorContext,
    ) -> Result<Clinic, CatalogError> {
        Self::require_admin(actor)?;
        request.validate()?;

        let clinic = self.clinics
            .update(id, request, actor.token())
            .await?
            .ok_or(CatalogError::ClinicNotFound)?;
        info!("Clinic {} updated by {}", id, actor.user_id);
        Ok(clinic)
    }

    pub async fn delete_clinic(&self, id: Uuid, actor: &ActorContext) -> Result<(), CatalogError> {
        Self::require_admin(actor)?;

        if !self.clinics.delete(id, actor.token()).await? {
            return Err(CatalogError::ClinicNotFound);
        }
        info!("Clinic {} deleted by {}", id, actor.user_id);
        Ok(())
    }

    // ==========================================================================
    // SERVICES
    // ==========================================================================

    /// Patients always get the active services only; `include_inactive` is an
    /// admin option.
    pub async fn list_services(
        &self,
        include_inactive: bool,
        actor: &ActorContext,
    ) -> Result<Vec<Service>, CatalogError> {
        let include_inactive = include_inactive && actor.is_admin();
        debug!("Listing services (include_inactive: {})", include_inactive);
        self.services.list(include_inactive, actor.token()).await
    }

    /// Any service, active or not. Historical appointments still refer to
    /// deactivated services.
    pub async fn get_service(&self, id: Uuid, actor: &ActorContext) -> Result<Service, CatalogError> {
        self.services
            .get(id, actor.token())
            .await?
            .ok_or(CatalogError::ServiceNotFound)
    }

    pub async fn create_service(
        &self,
        request: CreateServiceRequest,
        actor: &ActorContext,
    ) -> Result<Service, CatalogError> {
        Self::require_admin(actor)?;
        request.validate()?;

        let service = self.services
            .insert(request.into_service(Uuid::new_v4()), actor.token())
            .await?;
        info!("Service {} ({}) created by {}", service.id, service.name, actor.user_id);
        Ok(service)
    }

    pub async fn update_service(
        &self,
        id: Uuid,
        request: UpdateServiceRequest,
        actor: &ActorContext,
    ) -> Result<Service, CatalogError> {
        Self::require_admin(actor)?;
        request.validate()?;

        let service = self.services
            .update(id, request, actor.token())
            .await?
            .ok_or(CatalogError::ServiceNotFound)?;
        info!("Service {} updated by {} (active: {})", id, actor.user_id, service.active);
        Ok(service)
    }

    pub async fn delete_service(&self, id: Uuid, actor: &ActorContext) -> Result<(), CatalogError> {
        Self::require_admin(actor)?;

        if !self.services.delete(id, actor.token()).await? {
            return Err(CatalogError::ServiceNotFound);
        }
        info!("Service {} deleted by {}", id, actor.user_id);
        Ok(())
    }
}
