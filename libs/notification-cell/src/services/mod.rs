pub mod store;
pub mod email;
pub mod dispatcher;

pub use dispatcher::NotificationService;
pub use email::{EmailSender, LogEmailSender, SupabaseEmailSender};
pub use store::{InMemoryNotificationStore, NotificationStore, SupabaseNotificationStore};
