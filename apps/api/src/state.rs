use std::sync::Arc;

use tracing::info;

use appointment_cell::services::{
    AppointmentBookingService, AppointmentLedger, AppointmentStore, BookingDependencies,
    InMemoryAppointmentStore, SupabaseAppointmentStore,
};
use auth_cell::{InMemoryRoleDirectory, SupabaseRoleDirectory};
use calendar_cell::services::{CalendarService, CalendarStore, InMemoryCalendarStore, SupabaseCalendarStore};
use clinic_cell::services::{
    CatalogService, ClinicStore, InMemoryClinicStore, InMemoryServiceStore, ServiceStore,
    SupabaseClinicStore, SupabaseServiceStore,
};
use notification_cell::services::{
    EmailSender, InMemoryNotificationStore, LogEmailSender, NotificationService,
    NotificationStore, SupabaseEmailSender, SupabaseNotificationStore,
};
use patient_cell::services::{InMemoryPatientStore, PatientService, PatientStore, SupabasePatientStore};
use shared_config::{AppConfig, DataBackend};
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Role;
use shared_utils::extractor::{AuthState, RoleDirectory};

/// One implementation per entity, all on the same backend.
struct Stores {
    roles: Arc<dyn RoleDirectory>,
    clinics: Arc<dyn ClinicStore>,
    services: Arc<dyn ServiceStore>,
    patients: Arc<dyn PatientStore>,
    calendar: Arc<dyn CalendarStore>,
    appointments: Arc<dyn AppointmentStore>,
    notifications: Arc<dyn NotificationStore>,
    email: Arc<dyn EmailSender>,
}

impl Stores {
    fn supabase(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            roles: Arc::new(SupabaseRoleDirectory::new(Arc::clone(&supabase))),
            clinics: Arc::new(SupabaseClinicStore::new(Arc::clone(&supabase))),
            services: Arc::new(SupabaseServiceStore::new(Arc::clone(&supabase))),
            patients: Arc::new(SupabasePatientStore::new(Arc::clone(&supabase))),
            calendar: Arc::new(SupabaseCalendarStore::new(Arc::clone(&supabase))),
            appointments: Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase))),
            notifications: Arc::new(SupabaseNotificationStore::new(Arc::clone(&supabase))),
            email: Arc::new(SupabaseEmailSender::new(supabase, config.email_function_path.clone())),
        }
    }

    async fn in_memory(config: &AppConfig) -> Self {
        let admins = config
            .bootstrap_admin_ids
            .iter()
            .map(|id| (id.clone(), Role::Admin));

        Self {
            roles: Arc::new(InMemoryRoleDirectory::with_roles(admins).await),
            clinics: Arc::new(InMemoryClinicStore::new()),
            services: Arc::new(InMemoryServiceStore::new()),
            patients: Arc::new(InMemoryPatientStore::new()),
            calendar: Arc::new(InMemoryCalendarStore::new()),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            notifications: Arc::new(InMemoryNotificationStore::new()),
            email: Arc::new(LogEmailSender),
        }
    }
}

/// Every service the router mounts, wired over one shared set of stores.
#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthState,
    pub catalog: Arc<CatalogService>,
    pub patients: Arc<PatientService>,
    pub calendar: Arc<CalendarService>,
    pub appointments: Arc<AppointmentBookingService>,
    pub notifications: Arc<NotificationService>,
}

impl AppServices {
    pub async fn build(config: Arc<AppConfig>) -> Self {
        let stores = match config.data_backend {
            DataBackend::Supabase => Stores::supabase(&config),
            DataBackend::Memory => Stores::in_memory(&config).await,
        };
        info!("Using {:?} data backend", config.data_backend);

        let catalog = Arc::new(CatalogService::new(stores.clinics, stores.services));
        let patients = Arc::new(PatientService::new(stores.patients));
        let calendar = Arc::new(CalendarService::new(
            stores.calendar,
            Arc::new(AppointmentLedger::new(Arc::clone(&stores.appointments))),
            config.clinic_utc_offset_minutes,
        ));
        let notifications = Arc::new(NotificationService::new(stores.notifications, stores.email));

        let appointments = Arc::new(AppointmentBookingService::new(
            stores.appointments,
            BookingDependencies {
                catalog: Arc::clone(&catalog),
                patients: Arc::clone(&patients),
                calendar: Arc::clone(&calendar),
                notifications: Arc::clone(&notifications),
            },
        ));

        Self {
            auth: AuthState::new(config, stores.roles),
            catalog,
            patients,
            calendar,
            appointments,
            notifications,
        }
    }
}
