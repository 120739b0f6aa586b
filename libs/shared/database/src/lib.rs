pub mod memory;
pub mod supabase;

pub use memory::MemoryTable;
pub use supabase::{SupabaseClient, SupabaseError};
