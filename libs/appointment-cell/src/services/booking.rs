// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use calendar_cell::models::CalendarError;
use calendar_cell::services::CalendarService;
use clinic_cell::models::{CatalogError, Clinic, Service};
use clinic_cell::services::CatalogService;
use notification_cell::models::{NewNotification, NotificationKind, Recipient};
use notification_cell::services::NotificationService;
use patient_cell::models::{PatientError, PatientProfile};
use patient_cell::services::PatientService;
use shared_models::auth::ActorContext;
use shared_models::ClockTime;

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    ConflictCheckRequest, ConflictCheckResponse, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::{AppointmentLifecycleService, Requester};
use crate::services::store::AppointmentStore;

fn from_catalog(e: CatalogError) -> AppointmentError {
    match e {
        CatalogError::ClinicNotFound => AppointmentError::ClinicNotFound,
        CatalogError::ServiceNotFound => AppointmentError::ServiceNotFound,
        CatalogError::ValidationError(msg) => AppointmentError::ValidationError(msg),
        CatalogError::Unauthorized => AppointmentError::Unauthorized,
        CatalogError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
    }
}

fn from_patient(e: PatientError) -> AppointmentError {
    match e {
        PatientError::NotFound => AppointmentError::PatientNotFound,
        PatientError::ProfileIncomplete { missing } => AppointmentError::ProfileIncomplete { missing },
        PatientError::Unauthorized => AppointmentError::Unauthorized,
        PatientError::InvalidBirthDate => AppointmentError::ValidationError(e.to_string()),
        PatientError::ValidationError(msg) => AppointmentError::ValidationError(msg),
        PatientError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
    }
}

fn from_calendar(e: CalendarError) -> AppointmentError {
    match e {
        CalendarError::ValidationError(msg) => AppointmentError::ValidationError(msg),
        CalendarError::InvalidMonth { .. } => AppointmentError::ValidationError(e.to_string()),
        CalendarError::Unauthorized => AppointmentError::Unauthorized,
        CalendarError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
    }
}

/// Everything booking needs from the other cells.
pub struct BookingDependencies {
    pub catalog: Arc<CatalogService>,
    pub patients: Arc<PatientService>,
    pub calendar: Arc<CalendarService>,
    pub notifications: Arc<NotificationService>,
}

pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    catalog: Arc<CatalogService>,
    patients: Arc<PatientService>,
    calendar: Arc<CalendarService>,
    notifications: Arc<NotificationService>,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<dyn AppointmentStore>, deps: BookingDependencies) -> Self {
        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&store)),
            lifecycle_service: AppointmentLifecycleService::new(),
            store,
            catalog: deps.catalog,
            patients: deps.patients,
            calendar: deps.calendar,
            notifications: deps.notifications,
        }
    }

    /// Book an appointment.
    ///
    /// Patients book for themselves, into a slot the calendar offers them, and
    /// always end up `pending`. Admins book for any patient at any time that
    /// does not overlap another active appointment.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        actor: &ActorContext,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment at clinic {} on {} {} by {} ({})",
              request.clinic_id, request.date, request.time, actor.user_id, actor.role);

        // Step 1: input
        let time = request.validate()?;

        // Step 2: patient
        let patient = self.resolve_patient(request.patient_id, actor).await?;

        // Step 3: clinic and service
        let (clinic, service) = futures::try_join!(
            self.resolve_clinic(request.clinic_id, actor),
            self.resolve_service(request.service_id, actor),
        )?;
        // Patients always get the service's own length
        let duration_minutes = if actor.is_admin() {
            request.duration_minutes.unwrap_or(service.duration_minutes)
        } else {
            service.duration_minutes
        };

        // Step 4: patients may only pick an offered slot
        if !actor.is_admin() {
            self.ensure_slot_offered(&request, time, actor).await?;
        }

        // Step 5: status
        let status = if actor.is_admin() {
            request.status.unwrap_or(AppointmentStatus::Confirmed)
        } else {
            AppointmentStatus::Pending
        };

        // Step 6: atomic reserve
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            patient_name: patient.full_name.clone(),
            service_id: service.id,
            service_name: service.name.clone(),
            clinic_id: clinic.id,
            clinic_name: clinic.name.clone(),
            date: request.date,
            time,
            duration_minutes,
            status,
            notes: request.notes,
            created_at: None,
            updated_at: None,
        };

        let appointment = match self.store.reserve(appointment, actor.token()).await {
            Ok(appointment) => appointment,
            Err(AppointmentError::ConflictDetected) => {
                warn!("Appointment conflict at clinic {} on {} {}", clinic.id, request.date, time);
                return Err(AppointmentError::ConflictDetected);
            }
            Err(e) => return Err(e),
        };

        // Step 7: best-effort notification
        let kind = match appointment.status {
            AppointmentStatus::Confirmed => NotificationKind::AppointmentConfirmed,
            _ => NotificationKind::AppointmentRequested,
        };
        self.notify(&patient, &appointment, kind, actor).await;

        info!("Appointment {} booked as {} for patient {}",
              appointment.id, appointment.status, patient.id);
        Ok(appointment)
    }

    /// Apply a partial update: status changes, notes, and (admins only) a new
    /// date, time or duration.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        actor: &ActorContext,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {} by {}", appointment_id, actor.user_id);

        let new_time = request.validate()?;
        let reschedule = request.is_reschedule();
        let current = self.get_appointment(appointment_id, actor).await?;
        let requester = self.requester_for(&current, actor).await?;

        if reschedule && requester != Requester::Admin {
            return Err(AppointmentError::Unauthorized);
        }

        let mut updated = current.clone();

        if let Some(status) = request.status {
            self.lifecycle_service.validate_status_transition(current.status, status)?;
            if status != current.status {
                self.lifecycle_service.authorize_transition(requester, status)?;
            }
            updated.status = status;
        }

        if request.notes.is_some() {
            updated.notes = request.notes;
        }

        let saved = if reschedule {
            if !current.is_active() {
                return Err(AppointmentError::ValidationError(
                    "Cancelled appointments cannot be rescheduled".to_string(),
                ));
            }
            updated.date = request.date.unwrap_or(current.date);
            updated.time = new_time.unwrap_or(current.time);
            updated.duration_minutes = request.duration_minutes.unwrap_or(current.duration_minutes);

            self.store.reschedule(updated, actor.token()).await?
        } else {
            self.store
                .update(updated, actor.token())
                .await?
                .ok_or(AppointmentError::NotFound)?
        };

        let moved = saved.date != current.date
            || saved.time != current.time
            || saved.duration_minutes != current.duration_minutes;

        let kind = if saved.status != current.status {
            Some(match saved.status {
                AppointmentStatus::Confirmed => NotificationKind::AppointmentConfirmed,
                AppointmentStatus::Cancelled => NotificationKind::AppointmentCancelled,
                AppointmentStatus::Pending => NotificationKind::AppointmentRequested,
            })
        } else if moved {
            Some(NotificationKind::AppointmentRescheduled)
        } else {
            None
        };

        if let Some(kind) = kind {
            info!("Appointment {} is now {} ({:?})", saved.id, saved.status, kind);
            match self.patient_for(&saved, actor).await {
                Some(patient) => self.notify(&patient, &saved, kind, actor).await,
                None => warn!("No profile found to notify for appointment {}", saved.id),
            }
        }

        Ok(saved)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        actor: &ActorContext,
    ) -> Result<Appointment, AppointmentError> {
        self.update_appointment(
            appointment_id,
            UpdateAppointmentRequest::status(AppointmentStatus::Cancelled),
            actor,
        )
        .await
    }

    pub async fn confirm_appointment(
        &self,
        appointment_id: Uuid,
        actor: &ActorContext,
    ) -> Result<Appointment, AppointmentError> {
        self.update_appointment(
            appointment_id,
            UpdateAppointmentRequest::status(AppointmentStatus::Confirmed),
            actor,
        )
        .await
    }

    /// Hard delete. Admin only.
    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        actor: &ActorContext,
    ) -> Result<(), AppointmentError> {
        if !actor.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }
        if !self.store.delete(appointment_id, actor.token()).await? {
            return Err(AppointmentError::NotFound);
        }
        info!("Appointment {} deleted by {}", appointment_id, actor.user_id);
        Ok(())
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        actor: &ActorContext,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.store
            .get(appointment_id, actor.token())
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if self.requester_for(&appointment, actor).await? == Requester::Other {
            return Err(AppointmentError::Unauthorized);
        }
        Ok(appointment)
    }

    /// Admins see everything matching the query; patients only their own.
    pub async fn search_appointments(
        &self,
        mut query: AppointmentSearchQuery,
        actor: &ActorContext,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !actor.is_admin() {
            match self.patients.get_own(actor).await {
                Ok(profile) => query.patient_id = Some(profile.id),
                Err(PatientError::NotFound) => return Ok(Vec::new()),
                Err(e) => return Err(from_patient(e)),
            }
        }

        debug!("Searching appointments with query: {:?}", query);
        self.store.list(&query, actor.token()).await
    }

    pub async fn check_conflicts(
        &self,
        request: ConflictCheckRequest,
        actor: &ActorContext,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        self.conflict_service.check_conflicts(&request, actor.token()).await
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn resolve_patient(
        &self,
        patient_id: Option<Uuid>,
        actor: &ActorContext,
    ) -> Result<PatientProfile, AppointmentError> {
        if !actor.is_admin() {
            return self.patients.require_bookable(actor).await.map_err(from_patient);
        }

        let patient_id = patient_id.ok_or_else(|| {
            AppointmentError::ValidationError("patient_id is required when booking for a patient".to_string())
        })?;
        self.patients.get(patient_id, actor).await.map_err(from_patient)
    }

    async fn resolve_clinic(&self, clinic_id: Uuid, actor: &ActorContext) -> Result<Clinic, AppointmentError> {
        self.catalog.get_clinic(clinic_id, actor).await.map_err(from_catalog)
    }

    async fn resolve_service(&self, service_id: Uuid, actor: &ActorContext) -> Result<Service, AppointmentError> {
        let service = self.catalog.get_service(service_id, actor).await.map_err(from_catalog)?;
        if !service.active && !actor.is_admin() {
            return Err(AppointmentError::ServiceInactive);
        }
        Ok(service)
    }

    async fn ensure_slot_offered(
        &self,
        request: &CreateAppointmentRequest,
        time: ClockTime,
        actor: &ActorContext,
    ) -> Result<(), AppointmentError> {
        if request.date < self.calendar.local_now().date() {
            return Err(AppointmentError::InvalidTime(format!(
                "{} is in the past", request.date
            )));
        }

        let day = self.calendar
            .get_available_time_slots(request.clinic_id, request.date, actor)
            .await
            .map_err(from_calendar)?;

        if !day.offers(time) {
            warn!("Slot {} on {} is not offered at clinic {}", time, request.date, request.clinic_id);
            return Err(AppointmentError::SlotNotAvailable);
        }
        Ok(())
    }

    async fn requester_for(
        &self,
        appointment: &Appointment,
        actor: &ActorContext,
    ) -> Result<Requester, AppointmentError> {
        if actor.is_admin() {
            return Ok(Requester::Admin);
        }
        match self.patients.get_own(actor).await {
            Ok(profile) if profile.id == appointment.patient_id => Ok(Requester::Owner),
            Ok(_) | Err(PatientError::NotFound) => Ok(Requester::Other),
            Err(e) => Err(from_patient(e)),
        }
    }

    async fn patient_for(&self, appointment: &Appointment, actor: &ActorContext) -> Option<PatientProfile> {
        let lookup = if actor.is_admin() {
            self.patients.get(appointment.patient_id, actor).await
        } else {
            self.patients.get_own(actor).await
        };
        lookup.ok()
    }

    async fn notify(
        &self,
        patient: &PatientProfile,
        appointment: &Appointment,
        kind: NotificationKind,
        actor: &ActorContext,
    ) {
        let recipient = Recipient {
            user_id: patient.user_id.clone(),
            email: patient.email.clone(),
        };
        let outcome = self.notifications
            .dispatch(&recipient, notification_for(appointment, kind), actor.token())
            .await;
        debug!("Notification for appointment {}: {:?}", appointment.id, outcome);
    }
}

/// Patient-facing wording for an appointment event.
pub fn notification_for(appointment: &Appointment, kind: NotificationKind) -> NewNotification {
    let when = format!("{} at {}", appointment.date, appointment.time);
    let (title, message) = match kind {
        NotificationKind::AppointmentRequested => (
            "Appointment requested",
            format!("Your request for {} at {} on {} is awaiting confirmation.",
                    appointment.service_name, appointment.clinic_name, when),
        ),
        NotificationKind::AppointmentConfirmed => (
            "Appointment confirmed",
            format!("Your {} at {} on {} is confirmed.",
                    appointment.service_name, appointment.clinic_name, when),
        ),
        NotificationKind::AppointmentCancelled => (
            "Appointment cancelled",
            format!("Your {} at {} on {} was cancelled.",
                    appointment.service_name, appointment.clinic_name, when),
        ),
        NotificationKind::AppointmentRescheduled => (
            "Appointment rescheduled",
            format!("Your {} at {} is now on {}.",
                    appointment.service_name, appointment.clinic_name, when),
        ),
        NotificationKind::General => ("Appointment update", format!("Appointment on {}", when)),
    };
    NewNotification::new(kind, title, message)
}
