use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_test::assert_ok;
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentError, AppointmentSearchQuery, AppointmentStatus, ConflictCheckRequest,
    CreateAppointmentRequest, UpdateAppointmentRequest,
};
use appointment_cell::services::{
    AppointmentBookingService, AppointmentLedger, AppointmentStore, BookingDependencies,
    InMemoryAppointmentStore,
};
use calendar_cell::models::{CalendarConfiguration, DaySettings};
use calendar_cell::services::{CalendarService, CalendarStore, InMemoryCalendarStore};
use clinic_cell::models::{Clinic, Service};
use clinic_cell::services::{
    CatalogService, ClinicStore, InMemoryClinicStore, InMemoryServiceStore, ServiceStore,
};
use notification_cell::models::{Notification, NotificationError, NotificationKind};
use notification_cell::services::{
    InMemoryNotificationStore, LogEmailSender, NotificationService, NotificationStore,
};
use patient_cell::models::PatientProfile;
use patient_cell::services::{InMemoryPatientStore, PatientService, PatientStore};
use shared_models::auth::ActorContext;

struct Harness {
    booking: AppointmentBookingService,
    appointments: Arc<InMemoryAppointmentStore>,
    calendar_store: Arc<InMemoryCalendarStore>,
    patient_store: Arc<InMemoryPatientStore>,
    service_store: Arc<InMemoryServiceStore>,
    clinic: Clinic,
    service: Service,
    profile: PatientProfile,
    admin: ActorContext,
    patient: ActorContext,
}

struct UnavailableNotifications;

#[async_trait]
impl NotificationStore for UnavailableNotifications {
    async fn insert(&self, _n: Notification, _t: &str) -> Result<Notification, NotificationError> {
        Err(NotificationError::DatabaseError("connection refused".to_string()))
    }

    async fn list_for_user(&self, _u: &str, _r: bool, _t: &str) -> Result<Vec<Notification>, NotificationError> {
        Ok(Vec::new())
    }

    async fn mark_read(&self, _id: Uuid, _u: &str, _t: &str) -> Result<Option<Notification>, NotificationError> {
        Ok(None)
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 15).unwrap()
}

fn complete_profile(user_id: &str, name: &str) -> PatientProfile {
    PatientProfile {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        full_name: name.to_string(),
        email: Some(format!("{}@example.com", user_id)),
        phone: Some("+351 910 000 000".to_string()),
        id_number: Some("12345678".to_string()),
        birth_date: None,
        address: None,
        clinic_id: None,
        notes: None,
        created_at: None,
        updated_at: None,
    }
}

async fn harness_with(notifications: Arc<dyn NotificationStore>) -> Harness {
    let appointments = Arc::new(InMemoryAppointmentStore::new());
    let calendar_store = Arc::new(InMemoryCalendarStore::new());
    let patient_store = Arc::new(InMemoryPatientStore::new());
    let clinic_store = Arc::new(InMemoryClinicStore::new());
    let service_store = Arc::new(InMemoryServiceStore::new());

    let clinic = clinic_store
        .insert(
            Clinic {
                id: Uuid::new_v4(),
                name: "Central Clinic".to_string(),
                address: "Rua das Flores, 100".to_string(),
                city: "Lisboa".to_string(),
                state: "Lisboa".to_string(),
                zip_code: "1000-001".to_string(),
                phone: "+351 210 000 000".to_string(),
                created_at: None,
                updated_at: None,
            },
            "",
        )
        .await
        .unwrap();

    let service = service_store
        .insert(
            Service {
                id: Uuid::new_v4(),
                name: "General Consultation".to_string(),
                duration_minutes: 30,
                description: None,
                active: true,
                created_at: None,
                updated_at: None,
            },
            "",
        )
        .await
        .unwrap();

    let profile = patient_store
        .save(complete_profile("patient-1", "Ana Silva"), "")
        .await
        .unwrap();

    let ledger = Arc::new(AppointmentLedger::new(appointments.clone()));
    let store: Arc<dyn AppointmentStore> = appointments.clone();

    let booking = AppointmentBookingService::new(
        store,
        BookingDependencies {
            catalog: Arc::new(CatalogService::new(clinic_store, service_store.clone())),
            patients: Arc::new(PatientService::new(patient_store.clone())),
            calendar: Arc::new(CalendarService::new(calendar_store.clone(), ledger, 0)),
            notifications: Arc::new(NotificationService::new(notifications, Arc::new(LogEmailSender))),
        },
    );

    Harness {
        booking,
        appointments,
        calendar_store,
        patient_store,
        service_store,
        clinic,
        service,
        profile,
        admin: ActorContext::admin("admin-1"),
        patient: ActorContext::patient("patient-1"),
    }
}

async fn harness() -> (Harness, Arc<InMemoryNotificationStore>) {
    let notifications = Arc::new(InMemoryNotificationStore::new());
    (harness_with(notifications.clone()).await, notifications)
}

impl Harness {
    fn request(&self, time: &str) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: Some(self.profile.id),
            clinic_id: self.clinic.id,
            service_id: self.service.id,
            date: day(),
            time: time.to_string(),
            duration_minutes: None,
            status: None,
            notes: None,
        }
    }
}

#[tokio::test]
async fn test_patient_booking_is_always_pending() {
    let (h, notifications) = harness().await;

    let mut request = h.request("10:00");
    request.status = Some(AppointmentStatus::Confirmed);

    let appointment = h.booking.create_appointment(request, &h.patient).await.unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.patient_id, h.profile.id);
    assert_eq!(appointment.patient_name, "Ana Silva");
    assert_eq!(appointment.clinic_name, "Central Clinic");
    assert_eq!(appointment.duration_minutes, 30);

    let sent = notifications.list_for_user("patient-1", false, "").await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::AppointmentRequested);
}

#[tokio::test]
async fn test_patient_cannot_stretch_duration_past_the_slot() {
    let (h, _) = harness().await;

    let mut request = h.request("11:30");
    request.duration_minutes = Some(600);
    let appointment = h.booking.create_appointment(request, &h.patient).await.unwrap();
    assert_eq!(appointment.duration_minutes, h.service.duration_minutes);

    // The afternoon stays bookable for everyone else.
    let other = h.patient_store.save(complete_profile("patient-2", "Rui Costa"), "").await.unwrap();
    let mut afternoon = h.request("13:00");
    afternoon.patient_id = Some(other.id);
    let result = h
        .booking
        .create_appointment(afternoon, &ActorContext::patient("patient-2"))
        .await;
    assert_ok!(result);
}

#[tokio::test]
async fn test_admin_may_set_duration() {
    let (h, _) = harness().await;

    let mut request = h.request("10:00");
    request.duration_minutes = Some(45);
    let appointment = h.booking.create_appointment(request, &h.admin).await.unwrap();
    assert_eq!(appointment.duration_minutes, 45);
}

#[tokio::test]
async fn test_admin_booking_defaults_to_confirmed() {
    let (h, notifications) = harness().await;

    let appointment = h.booking.create_appointment(h.request("10:00"), &h.admin).await.unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    let sent = notifications.list_for_user("patient-1", false, "").await.unwrap();
    assert_eq!(sent[0].kind, NotificationKind::AppointmentConfirmed);
}

#[tokio::test]
async fn test_admin_must_name_the_patient() {
    let (h, _) = harness().await;

    let mut request = h.request("10:00");
    request.patient_id = None;

    let result = h.booking.create_appointment(request, &h.admin).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));

    let mut request = h.request("10:00");
    request.patient_id = Some(Uuid::new_v4());
    let result = h.booking.create_appointment(request, &h.admin).await;
    assert_matches!(result, Err(AppointmentError::PatientNotFound));
}

#[tokio::test]
async fn test_overlap_rejected_but_adjacent_accepted() {
    let (h, _) = harness().await;

    h.booking.create_appointment(h.request("10:00"), &h.admin).await.unwrap();

    let result = h.booking.create_appointment(h.request("10:15"), &h.admin).await;
    assert_matches!(result, Err(AppointmentError::ConflictDetected));

    let adjacent = h.booking.create_appointment(h.request("10:30"), &h.admin).await;
    assert_ok!(adjacent);
    assert_eq!(h.appointments.len().await, 2);
}

#[tokio::test]
async fn test_booked_slot_is_no_longer_offered_to_patients() {
    let (h, _) = harness().await;

    h.booking.create_appointment(h.request("10:00"), &h.admin).await.unwrap();

    let result = h.booking.create_appointment(h.request("10:00"), &h.patient).await;
    assert_matches!(result, Err(AppointmentError::SlotNotAvailable));
}

#[tokio::test]
async fn test_blocked_slot_only_bookable_by_admin() {
    let (h, _) = harness().await;

    let settings = DaySettings {
        blocked_times: vec!["09:00".parse().unwrap()],
        ..DaySettings::default()
    };
    h.calendar_store
        .upsert(CalendarConfiguration::new(h.clinic.id, day(), settings), "")
        .await
        .unwrap();

    let result = h.booking.create_appointment(h.request("09:00"), &h.patient).await;
    assert_matches!(result, Err(AppointmentError::SlotNotAvailable));

    let lunch = h.booking.create_appointment(h.request("12:00"), &h.patient).await;
    assert_matches!(lunch, Err(AppointmentError::SlotNotAvailable));

    let appointment = h.booking.create_appointment(h.request("09:00"), &h.admin).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_off_grid_time_not_offered_to_patients() {
    let (h, _) = harness().await;

    let result = h.booking.create_appointment(h.request("10:10"), &h.patient).await;
    assert_matches!(result, Err(AppointmentError::SlotNotAvailable));
}

#[tokio::test]
async fn test_incomplete_profile_cannot_book() {
    let (h, _) = harness().await;

    let mut profile = complete_profile("patient-2", "Rui Costa");
    profile.phone = None;
    h.patient_store.save(profile, "").await.unwrap();

    let result = h
        .booking
        .create_appointment(h.request("10:00"), &ActorContext::patient("patient-2"))
        .await;

    assert_matches!(result, Err(AppointmentError::ProfileIncomplete { missing }) => {
        assert_eq!(missing, vec!["phone".to_string()]);
    });

    let result = h
        .booking
        .create_appointment(h.request("10:00"), &ActorContext::patient("no-profile"))
        .await;
    assert_matches!(result, Err(AppointmentError::ProfileIncomplete { .. }));
}

#[tokio::test]
async fn test_patient_cannot_book_in_the_past() {
    let (h, _) = harness().await;

    let mut request = h.request("10:00");
    request.date = NaiveDate::from_ymd_opt(2020, 1, 14).unwrap();

    let result = h.booking.create_appointment(request, &h.patient).await;
    assert_matches!(result, Err(AppointmentError::InvalidTime(_)));
}

#[tokio::test]
async fn test_inactive_service_refused_for_patients() {
    let (h, _) = harness().await;

    let retired = h
        .service_store
        .insert(
            Service {
                id: Uuid::new_v4(),
                name: "Retired Therapy".to_string(),
                duration_minutes: 60,
                description: None,
                active: false,
                created_at: None,
                updated_at: None,
            },
            "",
        )
        .await
        .unwrap();

    let mut request = h.request("10:00");
    request.service_id = retired.id;
    let result = h.booking.create_appointment(request.clone(), &h.patient).await;
    assert_matches!(result, Err(AppointmentError::ServiceInactive));

    let appointment = h.booking.create_appointment(request, &h.admin).await.unwrap();
    assert_eq!(appointment.duration_minutes, 60);
}

#[tokio::test]
async fn test_cancel_rules_and_terminal_cancelled() {
    let (h, notifications) = harness().await;

    let appointment = h.booking.create_appointment(h.request("10:00"), &h.patient).await.unwrap();

    let confirm = h.booking.confirm_appointment(appointment.id, &h.patient).await;
    assert_matches!(confirm, Err(AppointmentError::Unauthorized));

    h.patient_store.save(complete_profile("patient-2", "Rui Costa"), "").await.unwrap();
    let stranger = h
        .booking
        .cancel_appointment(appointment.id, &ActorContext::patient("patient-2"))
        .await;
    assert_matches!(stranger, Err(AppointmentError::Unauthorized));

    let cancelled = h.booking.cancel_appointment(appointment.id, &h.patient).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let again = h.booking.confirm_appointment(appointment.id, &h.admin).await;
    assert_matches!(
        again,
        Err(AppointmentError::InvalidStatusTransition {
            from: AppointmentStatus::Cancelled,
            to: AppointmentStatus::Confirmed
        })
    );

    let kinds: Vec<NotificationKind> = notifications
        .list_for_user("patient-1", false, "")
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert!(kinds.contains(&NotificationKind::AppointmentCancelled));
}

#[tokio::test]
async fn test_cancelling_releases_the_interval() {
    let (h, _) = harness().await;

    let first = h.booking.create_appointment(h.request("10:00"), &h.patient).await.unwrap();
    h.booking.cancel_appointment(first.id, &h.admin).await.unwrap();

    let second = h.booking.create_appointment(h.request("10:00"), &h.patient).await;
    assert_ok!(second);
}

#[tokio::test]
async fn test_admin_confirms_pending() {
    let (h, _) = harness().await;

    let appointment = h.booking.create_appointment(h.request("10:00"), &h.patient).await.unwrap();
    let confirmed = h.booking.confirm_appointment(appointment.id, &h.admin).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    // Same status again is accepted.
    let same = h.booking.confirm_appointment(appointment.id, &h.admin).await.unwrap();
    assert_eq!(same.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_reschedule_checks_conflicts_excluding_itself() {
    let (h, notifications) = harness().await;

    let first = h.booking.create_appointment(h.request("10:00"), &h.admin).await.unwrap();
    h.booking.create_appointment(h.request("11:00"), &h.admin).await.unwrap();

    let longer = UpdateAppointmentRequest { duration_minutes: Some(60), ..Default::default() };
    let moved = h.booking.update_appointment(first.id, longer, &h.admin).await.unwrap();
    assert_eq!(moved.duration_minutes, 60);

    let into_next = UpdateAppointmentRequest {
        time: Some("10:30".to_string()),
        ..Default::default()
    };
    let result = h.booking.update_appointment(first.id, into_next, &h.admin).await;
    assert_matches!(result, Err(AppointmentError::ConflictDetected));

    let by_patient = UpdateAppointmentRequest {
        time: Some("14:00".to_string()),
        ..Default::default()
    };
    let result = h.booking.update_appointment(first.id, by_patient, &h.patient).await;
    assert_matches!(result, Err(AppointmentError::Unauthorized));

    let kinds: Vec<NotificationKind> = notifications
        .list_for_user("patient-1", false, "")
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert!(kinds.contains(&NotificationKind::AppointmentRescheduled));
}

#[tokio::test]
async fn test_only_admins_delete() {
    let (h, _) = harness().await;

    let appointment = h.booking.create_appointment(h.request("10:00"), &h.patient).await.unwrap();

    let result = h.booking.delete_appointment(appointment.id, &h.patient).await;
    assert_matches!(result, Err(AppointmentError::Unauthorized));

    h.booking.delete_appointment(appointment.id, &h.admin).await.unwrap();
    assert_eq!(h.appointments.len().await, 0);

    let missing = h.booking.delete_appointment(appointment.id, &h.admin).await;
    assert_matches!(missing, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn test_listing_is_scoped_for_patients() {
    let (h, _) = harness().await;

    let other = h.patient_store.save(complete_profile("patient-2", "Rui Costa"), "").await.unwrap();
    h.booking.create_appointment(h.request("10:00"), &h.patient).await.unwrap();
    let mut for_other = h.request("11:00");
    for_other.patient_id = Some(other.id);
    h.booking.create_appointment(for_other, &h.admin).await.unwrap();

    let all = h.booking.search_appointments(AppointmentSearchQuery::default(), &h.admin).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].time < all[1].time);

    let query = AppointmentSearchQuery { patient_id: Some(other.id), ..Default::default() };
    let own = h.booking.search_appointments(query, &h.patient).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].patient_id, h.profile.id);

    let none = h
        .booking
        .search_appointments(AppointmentSearchQuery::default(), &ActorContext::patient("no-profile"))
        .await
        .unwrap();
    assert!(none.is_empty());

    let result = h.booking.get_appointment(all[1].id, &h.patient).await;
    assert_matches!(result, Err(AppointmentError::Unauthorized));
}

#[tokio::test]
async fn test_notification_failure_keeps_the_booking() {
    let h = harness_with(Arc::new(UnavailableNotifications)).await;

    let appointment = h.booking.create_appointment(h.request("10:00"), &h.patient).await;

    assert_ok!(appointment);
    assert_eq!(h.appointments.len().await, 1);
}

#[tokio::test]
async fn test_check_conflicts_reports_count() {
    let (h, _) = harness().await;

    let booked = h.booking.create_appointment(h.request("10:00"), &h.admin).await.unwrap();

    let request = ConflictCheckRequest {
        clinic_id: h.clinic.id,
        date: day(),
        time: "09:45".to_string(),
        duration_minutes: 30,
        exclude_appointment_id: None,
    };
    let response = h.booking.check_conflicts(request.clone(), &h.patient).await.unwrap();
    assert!(response.has_conflict);
    assert_eq!(response.conflicting_count, 1);

    let excluded = ConflictCheckRequest { exclude_appointment_id: Some(booked.id), ..request };
    let response = h.booking.check_conflicts(excluded, &h.patient).await.unwrap();
    assert!(!response.has_conflict);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_for_one_slot_admit_exactly_one() {
    let (h, _) = harness().await;
    let h = Arc::new(h);

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.booking.create_appointment(h.request("10:00"), &h.admin).await })
        })
        .collect();

    let mut booked = 0;
    let mut conflicts = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => booked += 1,
            Err(AppointmentError::ConflictDetected) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(h.appointments.len().await, 1);
}
