//! Persistence implementations
//!
//! Network-backed implementations of the domain repository traits.

mod supabase_image_repo;

pub use supabase_image_repo::{
    extension_for, SupabaseImageRepository, SupabaseStorageOptions, DEFAULT_BUCKET,
    DEFAULT_PREFIX, DEFAULT_STORAGE_TIMEOUT,
};
