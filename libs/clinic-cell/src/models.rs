// libs/clinic-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CLINICS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicRequest {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub phone: String,
}

impl CreateClinicRequest {
    pub fn validate(&self) -> Result<(), CatalogError> {
        require_name(&self.name)
    }

    pub fn into_clinic(self, id: Uuid) -> Clinic {
        Clinic {
            id,
            name: self.name.trim().to_string(),
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            phone: self.phone,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClinicRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UpdateClinicRequest {
    pub fn validate(&self) -> Result<(), CatalogError> {
        match &self.name {
            Some(name) => require_name(name),
            None => Ok(()),
        }
    }

    pub fn apply_to(self, clinic: &mut Clinic) {
        if let Some(name) = self.name {
            clinic.name = name.trim().to_string();
        }
        if let Some(address) = self.address {
            clinic.address = address;
        }
        if let Some(city) = self.city {
            clinic.city = city;
        }
        if let Some(state) = self.state {
            clinic.state = state;
        }
        if let Some(zip_code) = self.zip_code {
            clinic.zip_code = zip_code;
        }
        if let Some(phone) = self.phone {
            clinic.phone = phone;
        }
    }
}

// ==============================================================================
// SERVICES
// ==============================================================================

/// A bookable service. Inactive services stay stored for historical
/// appointments but are hidden from patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub description: Option<String>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CreateServiceRequest {
    pub fn validate(&self) -> Result<(), CatalogError> {
        require_name(&self.name)?;
        require_duration(self.duration_minutes)
    }

    pub fn into_service(self, id: Uuid) -> Service {
        Service {
            id,
            name: self.name.trim().to_string(),
            duration_minutes: self.duration_minutes,
            description: self.description,
            active: self.active,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServiceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl UpdateServiceRequest {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if let Some(name) = &self.name {
            require_name(name)?;
        }
        if let Some(duration) = self.duration_minutes {
            require_duration(duration)?;
        }
        Ok(())
    }

    pub fn apply_to(self, service: &mut Service) {
        if let Some(name) = self.name {
            service.name = name.trim().to_string();
        }
        if let Some(duration) = self.duration_minutes {
            service.duration_minutes = duration;
        }
        if let Some(description) = self.description {
            service.description = Some(description);
        }
        if let Some(active) = self.active {
            service.active = active;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

fn require_name(name: &str) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::ValidationError("Name is required".to_string()));
    }
    Ok(())
}

fn require_duration(minutes: i32) -> Result<(), CatalogError> {
    if minutes <= 0 {
        return Err(CatalogError::ValidationError(
            "Duration must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Only administrators can change the catalog")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
