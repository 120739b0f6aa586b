use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::InMemoryRoleDirectory;
use patient_cell::models::{PatientError, PatientSearchQuery, UpsertProfileRequest};
use patient_cell::services::{InMemoryPatientStore, PatientService, PatientStore, SupabasePatientStore};
use patient_cell::patient_routes;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::ActorContext;
use shared_utils::extractor::AuthState;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn service() -> PatientService {
    PatientService::new(Arc::new(InMemoryPatientStore::new()))
}

fn complete_request(name: &str, id_number: &str) -> UpsertProfileRequest {
    UpsertProfileRequest {
        full_name: Some(name.to_string()),
        phone: Some("+351 910 000 000".to_string()),
        id_number: Some(id_number.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_first_save_creates_then_merges() {
    let patients = service();
    let actor = ActorContext::patient("user-1").with_email("ana@example.com");

    let created = patients
        .upsert_own(
            UpsertProfileRequest { full_name: Some("Ana Silva".to_string()), ..Default::default() },
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(created.email.as_deref(), Some("ana@example.com"));
    assert!(!created.is_complete());

    let updated = patients
        .upsert_own(
            UpsertProfileRequest {
                phone: Some("+351 910 000 000".to_string()),
                id_number: Some("12345678".to_string()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.full_name, "Ana Silva");
    assert!(updated.is_complete());
    assert!(patients.completeness(&actor).await.unwrap().complete);
}

#[tokio::test]
async fn test_require_bookable_rejects_incomplete_profile() {
    let patients = service();
    let actor = ActorContext::patient("user-2");

    assert_matches!(
        patients.require_bookable(&actor).await,
        Err(PatientError::ProfileIncomplete { missing }) if missing.len() == 3
    );

    patients
        .upsert_own(
            UpsertProfileRequest { full_name: Some("Rui Costa".to_string()), ..Default::default() },
            &actor,
        )
        .await
        .unwrap();

    assert_matches!(
        patients.require_bookable(&actor).await,
        Err(PatientError::ProfileIncomplete { missing }) if missing == vec!["id_number", "phone"]
    );
}

#[tokio::test]
async fn test_patients_only_read_their_own_profile() {
    let patients = service();
    let owner = ActorContext::patient("user-1");
    let other = ActorContext::patient("user-2");

    let profile = patients.upsert_own(complete_request("Ana Silva", "111"), &owner).await.unwrap();

    assert!(patients.get(profile.id, &owner).await.is_ok());
    assert_matches!(patients.get(profile.id, &other).await, Err(PatientError::Unauthorized));
    assert!(patients.get(profile.id, &ActorContext::admin("admin-1")).await.is_ok());
}

#[tokio::test]
async fn test_admin_search_by_name_or_id_number() {
    let patients = service();
    patients
        .upsert_own(complete_request("Ana Silva", "11111111"), &ActorContext::patient("u1"))
        .await
        .unwrap();
    patients
        .upsert_own(complete_request("Bruno Sousa", "22222222"), &ActorContext::patient("u2"))
        .await
        .unwrap();

    let admin = ActorContext::admin("admin-1");

    let by_name = patients
        .search(PatientSearchQuery { q: Some("silva".to_string()), ..Default::default() }, &admin)
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].full_name, "Ana Silva");

    let by_id = patients
        .search(PatientSearchQuery { q: Some("2222".to_string()), ..Default::default() }, &admin)
        .await
        .unwrap();
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0].full_name, "Bruno Sousa");

    assert_matches!(
        patients.search(PatientSearchQuery::default(), &ActorContext::patient("u1")).await,
        Err(PatientError::Unauthorized)
    );
}

#[tokio::test]
async fn test_supabase_profile_lookup_by_user() {
    let mock_server = MockServer::start().await;
    let profile_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_profiles"))
        .and(query_param("user_id", "eq.user-1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_profile_response(&profile_id, "user-1", "Ana Silva")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::supabase(&mock_server.uri()).to_app_config();
    let store = SupabasePatientStore::new(Arc::new(SupabaseClient::new(&config)));

    let profile = store.by_user("user-1", "test-token").await.unwrap().unwrap();

    assert_eq!(profile.id.to_string(), profile_id);
    assert!(profile.is_complete());
}

#[tokio::test]
async fn test_completeness_route() {
    let user = TestUser::patient("patient@example.com");
    let config = TestConfig::default();
    let auth = AuthState::new(config.to_arc(), Arc::new(InMemoryRoleDirectory::new()));
    let app = patient_routes(auth, Arc::new(service()));
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/me/completeness")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["exists"], json!(false));
    assert_eq!(body["complete"], json!(false));
}
