use std::env;
use std::str::FromStr;
use tracing::warn;

/// Which implementation backs every entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBackend {
    /// Live Supabase (PostgREST + RPC + edge functions).
    Supabase,
    /// In-process fixture tables. Same shapes, nothing persisted.
    Memory,
}

impl FromStr for DataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" | "live" => Ok(DataBackend::Supabase),
            "memory" | "in-memory" | "fixture" => Ok(DataBackend::Memory),
            other => Err(format!("Unknown data backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub data_backend: DataBackend,
    /// Offset of the clinics' wall clock from UTC, used for the "past slot" rule.
    pub clinic_utc_offset_minutes: i32,
    pub server_port: u16,
    pub email_function_path: String,
    /// User ids granted the admin role at startup by the in-memory role directory.
    pub bootstrap_admin_ids: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = env::var("SUPABASE_URL")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            });
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });
        let supabase_jwt_secret = env::var("SUPABASE_JWT_SECRET")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_JWT_SECRET not set, using empty value");
                String::new()
            });

        let supabase_ready = !supabase_url.is_empty() && !supabase_anon_key.is_empty();

        let data_backend = match env::var("DATA_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                warn!("{}, falling back to in-memory store", e);
                DataBackend::Memory
            }),
            Err(_) if supabase_ready => DataBackend::Supabase,
            Err(_) => {
                warn!("DATA_BACKEND not set and Supabase not configured, using in-memory store");
                DataBackend::Memory
            }
        };

        let clinic_utc_offset_minutes = env::var("CLINIC_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|raw| {
                raw.parse::<i32>()
                    .map_err(|_| warn!("CLINIC_UTC_OFFSET_MINUTES is not an integer, using 0"))
                    .ok()
            })
            .unwrap_or(0);

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(3000);

        let email_function_path = env::var("EMAIL_FUNCTION_PATH")
            .unwrap_or_else(|_| "/functions/v1/send-email".to_string());

        let bootstrap_admin_ids = env::var("BOOTSTRAP_ADMIN_IDS")
            .map(|raw| parse_id_list(&raw))
            .unwrap_or_default();

        let config = Self {
            supabase_url,
            supabase_anon_key,
            supabase_jwt_secret,
            data_backend,
            clinic_utc_offset_minutes,
            server_port,
            email_function_path,
            bootstrap_admin_ids,
        };

        if config.data_backend == DataBackend::Supabase && !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn uses_memory_store(&self) -> bool {
        self.data_backend == DataBackend::Memory
    }
}

fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
