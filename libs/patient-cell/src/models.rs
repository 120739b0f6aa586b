use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};

/// One profile per authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    pub id: Uuid,
    pub user_id: String,
    #[serde(default)]
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// National identity document number.
    pub id_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub clinic_id: Option<Uuid>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

impl PatientProfile {
    /// Fields that must be filled before the patient can book.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(Some(&self.full_name)) {
            missing.push("full_name");
        }
        if is_blank(self.id_number.as_deref()) {
            missing.push("id_number");
        }
        if is_blank(self.phone.as_deref()) {
            missing.push("phone");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Body of `PUT /patients/me`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl UpsertProfileRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        if let Some(birth_date) = self.birth_date {
            if birth_date > Utc::now().date_naive() {
                return Err(PatientError::InvalidBirthDate);
            }
        }
        if let Some(name) = &self.full_name {
            if name.trim().is_empty() {
                return Err(PatientError::ValidationError("Full name cannot be blank".to_string()));
            }
        }
        Ok(())
    }

    pub fn apply_to(self, profile: &mut PatientProfile) {
        if let Some(full_name) = self.full_name {
            profile.full_name = full_name.trim().to_string();
        }
        if self.email.is_some() {
            profile.email = self.email;
        }
        if self.phone.is_some() {
            profile.phone = self.phone;
        }
        if self.id_number.is_some() {
            profile.id_number = self.id_number;
        }
        if self.birth_date.is_some() {
            profile.birth_date = self.birth_date;
        }
        if self.address.is_some() {
            profile.address = self.address;
        }
        if self.clinic_id.is_some() {
            profile.clinic_id = self.clinic_id;
        }
        if self.notes.is_some() {
            profile.notes = self.notes;
        }
    }

    /// First profile for `user_id`. Requires a full name.
    pub fn into_profile(self, user_id: &str, fallback_email: Option<String>) -> Result<PatientProfile, PatientError> {
        let full_name = match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(PatientError::ValidationError(
                    "Full name is required to create a profile".to_string(),
                ))
            }
        };

        Ok(PatientProfile {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            full_name,
            email: self.email.or(fallback_email),
            phone: self.phone,
            id_number: self.id_number,
            birth_date: self.birth_date,
            address: self.address,
            clinic_id: self.clinic_id,
            notes: self.notes,
            created_at: None,
            updated_at: None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileCompleteness {
    pub exists: bool,
    pub complete: bool,
    pub missing: Vec<String>,
}

impl ProfileCompleteness {
    pub fn of(profile: Option<&PatientProfile>) -> Self {
        match profile {
            Some(profile) => {
                let missing: Vec<String> = profile.missing_fields().into_iter().map(String::from).collect();
                Self { exists: true, complete: missing.is_empty(), missing }
            }
            None => Self {
                exists: false,
                complete: false,
                missing: vec!["full_name".into(), "id_number".into(), "phone".into()],
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    /// Matches name or id number, case-insensitive.
    pub q: Option<String>,
    pub clinic_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient profile is incomplete; missing: {}", .missing.join(", "))]
    ProfileIncomplete { missing: Vec<String> },

    #[error("Invalid birth date")]
    InvalidBirthDate,

    #[error("Unauthorized access to patient data")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
