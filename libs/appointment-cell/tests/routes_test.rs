use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_json as json_body_matcher, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::appointment_routes;
use appointment_cell::models::{Appointment, AppointmentError, AppointmentStatus};
use appointment_cell::services::{
    AppointmentBookingService, AppointmentLedger, AppointmentStore, BookingDependencies,
    InMemoryAppointmentStore, SupabaseAppointmentStore,
};
use auth_cell::InMemoryRoleDirectory;
use calendar_cell::services::{CalendarService, InMemoryCalendarStore};
use clinic_cell::models::{Clinic, Service};
use clinic_cell::services::{
    CatalogService, ClinicStore, InMemoryClinicStore, InMemoryServiceStore, ServiceStore,
};
use notification_cell::services::{InMemoryNotificationStore, LogEmailSender, NotificationService};
use patient_cell::models::PatientProfile;
use patient_cell::services::{InMemoryPatientStore, PatientService, PatientStore};
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Role;
use shared_utils::extractor::AuthState;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    router: axum::Router,
    clinic_id: Uuid,
    service_id: Uuid,
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn bearer(user: &TestUser) -> String {
    let token = JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, Some(1));
    format!("Bearer {}", token)
}

fn profile(user: &TestUser, phone: Option<&str>) -> PatientProfile {
    PatientProfile {
        id: Uuid::new_v4(),
        user_id: user.id.clone(),
        full_name: "Ana Silva".to_string(),
        email: Some(user.email.clone()),
        phone: phone.map(str::to_string),
        id_number: Some("12345678".to_string()),
        birth_date: None,
        address: None,
        clinic_id: None,
        notes: None,
        created_at: None,
        updated_at: None,
    }
}

async fn test_app(admin: &TestUser, patients: &[PatientProfile]) -> TestApp {
    let appointments: Arc<dyn AppointmentStore> = Arc::new(InMemoryAppointmentStore::new());
    let clinic_store = Arc::new(InMemoryClinicStore::new());
    let service_store = Arc::new(InMemoryServiceStore::new());
    let patient_store = Arc::new(InMemoryPatientStore::new());

    let clinic_id = Uuid::new_v4();
    clinic_store
        .insert(
            serde_json::from_value::<Clinic>(MockSupabaseResponses::clinic_response(
                &clinic_id.to_string(),
                "Central Clinic",
            ))
            .unwrap(),
            "",
        )
        .await
        .unwrap();

    let service_id = Uuid::new_v4();
    service_store
        .insert(
            serde_json::from_value::<Service>(MockSupabaseResponses::service_response(
                &service_id.to_string(),
                "General Consultation",
                30,
                true,
            ))
            .unwrap(),
            "",
        )
        .await
        .unwrap();

    for patient in patients {
        patient_store.save(patient.clone(), "").await.unwrap();
    }

    let booking = Arc::new(AppointmentBookingService::new(
        appointments.clone(),
        BookingDependencies {
            catalog: Arc::new(CatalogService::new(clinic_store, service_store)),
            patients: Arc::new(PatientService::new(patient_store)),
            calendar: Arc::new(CalendarService::new(
                Arc::new(InMemoryCalendarStore::new()),
                Arc::new(AppointmentLedger::new(appointments)),
                0,
            )),
            notifications: Arc::new(NotificationService::new(
                Arc::new(InMemoryNotificationStore::new()),
                Arc::new(LogEmailSender),
            )),
        },
    ));

    let config = TestConfig::default();
    let roles = InMemoryRoleDirectory::with_roles([(admin.id.clone(), Role::Admin)]).await;
    let auth = AuthState::new(config.to_arc(), Arc::new(roles));

    TestApp { router: appointment_routes(auth, booking), clinic_id, service_id }
}

fn booking_body(app: &TestApp, time: &str) -> String {
    json!({
        "clinic_id": app.clinic_id,
        "service_id": app.service_id,
        "date": "2030-01-15",
        "time": time
    })
    .to_string()
}

fn post(uri: &str, user: &TestUser, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", bearer(user))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_booking_requires_token() {
    let admin = TestUser::admin("admin@example.com");
    let app = test_app(&admin, &[]).await;
    let body = booking_body(&app, "10:00");

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_patient_books_then_same_slot_conflicts() {
    let admin = TestUser::admin("admin@example.com");
    let patient = TestUser::patient("ana@example.com");
    let app = test_app(&admin, &[profile(&patient, Some("+351 910 000 000"))]).await;

    let response = app
        .router
        .clone()
        .oneshot(post("/", &patient, booking_body(&app, "10:00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("pending"));
    assert_eq!(body["time"], json!("10:00"));

    let response = app
        .router
        .clone()
        .oneshot(post("/", &patient, booking_body(&app, "10:00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_incomplete_profile_is_precondition_failed() {
    let admin = TestUser::admin("admin@example.com");
    let patient = TestUser::patient("ana@example.com");
    let app = test_app(&admin, &[profile(&patient, None)]).await;

    let response = app
        .router
        .clone()
        .oneshot(post("/", &patient, booking_body(&app, "10:00")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_check_conflict_route() {
    let admin = TestUser::admin("admin@example.com");
    let patient = TestUser::patient("ana@example.com");
    let app = test_app(&admin, &[profile(&patient, Some("+351 910 000 000"))]).await;

    let response = app
        .router
        .clone()
        .oneshot(post("/", &patient, booking_body(&app, "10:00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let check = json!({
        "clinic_id": app.clinic_id,
        "date": "2030-01-15",
        "time": "10:15",
        "duration_minutes": 30
    });
    let response = app
        .router
        .oneshot(post("/check-conflict", &patient, check.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["has_conflict"], json!(true));
    assert_eq!(body["conflicting_count"], json!(1));
}

#[tokio::test]
async fn test_patient_cannot_delete() {
    let admin = TestUser::admin("admin@example.com");
    let patient = TestUser::patient("ana@example.com");
    let app = test_app(&admin, &[]).await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/{}", Uuid::new_v4()))
                .header("authorization", bearer(&patient))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ==============================================================================
// SUPABASE STORE
// ==============================================================================

fn appointment(clinic_id: Uuid) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        patient_name: "Test Patient".to_string(),
        service_id: Uuid::new_v4(),
        service_name: "General Consultation".to_string(),
        clinic_id,
        clinic_name: "Central Clinic".to_string(),
        date: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
        time: "10:00".parse().unwrap(),
        duration_minutes: 30,
        status: AppointmentStatus::Pending,
        notes: None,
        created_at: None,
        updated_at: None,
    }
}

fn supabase_store(server: &MockServer) -> SupabaseAppointmentStore {
    let config = TestConfig::supabase(&server.uri()).to_app_config();
    SupabaseAppointmentStore::new(Arc::new(SupabaseClient::new(&config)))
}

fn appointment_row(clinic_id: Uuid, time: &str) -> Value {
    MockSupabaseResponses::appointment_response(
        &Uuid::new_v4().to_string(),
        &clinic_id.to_string(),
        &Uuid::new_v4().to_string(),
        "2030-01-15",
        time,
    )
}

#[tokio::test]
async fn test_supabase_reserve_refused_when_rpc_reports_conflict() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/check_appointment_conflict"))
        .and(json_body_matcher(json!({ "p_date": "2030-01-15", "p_time": "10:00", "p_duration": 30 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(clinic_id, "09:45")])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = supabase_store(&mock_server).reserve(appointment(clinic_id), "test-token").await;
    assert_matches!(result, Err(AppointmentError::ConflictDetected));
}

#[tokio::test]
async fn test_supabase_reserve_ignores_rpc_hit_at_another_clinic() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/check_appointment_conflict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([appointment_row(clinic_id, "10:00")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let saved = supabase_store(&mock_server).reserve(appointment(clinic_id), "test-token").await.unwrap();
    assert_eq!(saved.clinic_id, clinic_id);
}

#[tokio::test]
async fn test_supabase_reserve_checks_day_when_rpc_missing() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/check_appointment_conflict"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "PGRST202",
            "message": "Could not find the function public.check_appointment_conflict"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "in.(pending,confirmed)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(clinic_id, "10:15")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = supabase_store(&mock_server).reserve(appointment(clinic_id), "test-token").await;
    assert_matches!(result, Err(AppointmentError::ConflictDetected));
}

#[tokio::test]
async fn test_supabase_reserve_maps_unique_violation_to_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/check_appointment_conflict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_slot_key\""
        })))
        .mount(&mock_server)
        .await;

    let result = supabase_store(&mock_server).reserve(appointment(Uuid::new_v4()), "test-token").await;
    assert_matches!(result, Err(AppointmentError::ConflictDetected));
}

#[tokio::test]
async fn test_supabase_reserve_returns_inserted_row() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let row = MockSupabaseResponses::appointment_response(
        &Uuid::new_v4().to_string(),
        &clinic_id.to_string(),
        &Uuid::new_v4().to_string(),
        "2030-01-15",
        "10:00",
    );

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/check_appointment_conflict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "status": "pending", "time": "10:00" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let saved = supabase_store(&mock_server).reserve(appointment(clinic_id), "test-token").await.unwrap();
    assert_eq!(saved.clinic_id, clinic_id);
    assert_eq!(saved.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn test_supabase_active_on_day_filters_cancelled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "in.(pending,confirmed)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let rows = supabase_store(&mock_server)
        .active_on_day(Uuid::new_v4(), NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(), "test-token")
        .await
        .unwrap();

    assert!(rows.is_empty());
}
