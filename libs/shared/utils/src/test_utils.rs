use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, DataBackend};
use shared_models::auth::{ActorContext, Role, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub data_backend: DataBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            data_backend: DataBackend::Memory,
        }
    }
}

impl TestConfig {
    /// Config pointing the live store at a mock server.
    pub fn supabase(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            data_backend: DataBackend::Supabase,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            data_backend: self.data_backend,
            clinic_utc_offset_minutes: 0,
            server_port: 3000,
            email_function_path: "/functions/v1/send-email".to_string(),
            bootstrap_admin_ids: Vec::new(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// A signed-in user. `role` is what the role directory should report for
/// them; tokens always carry the `authenticated` claim.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::patient("test@example.com")
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role,
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some("authenticated".to_string()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn to_actor(&self) -> ActorContext {
        ActorContext::new(self.id.clone(), self.role)
            .with_email(self.email.clone())
            .with_token("test-token")
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        // Supabase always issues `authenticated`; the clinic role lives in `user_roles`.
        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row shapes as PostgREST returns them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn clinic_response(clinic_id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": clinic_id,
            "name": name,
            "address": "Rua das Flores, 100",
            "city": "Lisboa",
            "state": "Lisboa",
            "zip_code": "1000-001",
            "phone": "+351 210 000 000",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn service_response(service_id: &str, name: &str, duration_minutes: i32, active: bool) -> serde_json::Value {
        json!({
            "id": service_id,
            "name": name,
            "duration_minutes": duration_minutes,
            "description": format!("{} session", name),
            "active": active,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_profile_response(profile_id: &str, user_id: &str, full_name: &str) -> serde_json::Value {
        json!({
            "id": profile_id,
            "user_id": user_id,
            "full_name": full_name,
            "email": "patient@example.com",
            "phone": "+351 910 000 000",
            "id_number": "12345678",
            "birth_date": "1990-05-17",
            "address": "Avenida Central, 12",
            "clinic_id": null,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn calendar_response(clinic_id: &str, date: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "date": date,
            "is_open": true,
            "start_time": "08:00:00",
            "end_time": "10:00:00",
            "interval_minutes": 30,
            "lunch_break_start": null,
            "lunch_break_end": null,
            "blocked_times": ["09:00:00"],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(patient_id: &str, clinic_id: &str, service_id: &str, date: &str, time: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "patient_name": "Test Patient",
            "service_id": service_id,
            "service_name": "General Consultation",
            "clinic_id": clinic_id,
            "clinic_name": "Central Clinic",
            "date": date,
            "time": time,
            "duration_minutes": 30,
            "status": "pending",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, config.supabase_url);
        assert_eq!(app_config.supabase_jwt_secret, config.jwt_secret);
        assert!(app_config.uses_memory_store());
    }

    #[test]
    fn test_user_to_actor_keeps_role() {
        let admin = TestUser::admin("admin@example.com");
        let actor = admin.to_actor();
        assert!(actor.is_admin());
        assert_eq!(actor.user_id, admin.id);

        let patient = TestUser::patient("p@example.com").to_actor();
        assert!(!patient.is_admin());
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }
}
