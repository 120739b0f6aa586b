pub mod store;
pub mod patient;

pub use patient::PatientService;
pub use store::{InMemoryPatientStore, PatientStore, SupabasePatientStore};
