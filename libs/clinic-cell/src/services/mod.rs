pub mod store;
pub mod catalog;

pub use catalog::CatalogService;
pub use store::{
    ClinicStore, InMemoryClinicStore, InMemoryServiceStore, ServiceStore, SupabaseClinicStore,
    SupabaseServiceStore,
};
