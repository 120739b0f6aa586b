pub mod slots;
pub mod availability;
pub mod store;
pub mod calendar;

pub use calendar::CalendarService;
pub use store::{BookedSlotSource, CalendarStore, InMemoryCalendarStore, NoBookings, SupabaseCalendarStore};
