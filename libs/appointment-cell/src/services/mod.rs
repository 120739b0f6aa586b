pub mod store;
pub mod conflict;
pub mod lifecycle;
pub mod booking;
pub mod ledger;

pub use booking::{AppointmentBookingService, BookingDependencies};
pub use conflict::ConflictDetectionService;
pub use ledger::AppointmentLedger;
pub use lifecycle::{AppointmentLifecycleService, Requester};
pub use store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
