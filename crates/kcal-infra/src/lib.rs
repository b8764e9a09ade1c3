//! Infrastructure layer - adapters for the domain capability traits

pub mod capture;
pub mod persistence;

pub use capture::{frame_to_image_reference, StillImageCaptureService};
pub use persistence::{SupabaseImageRepository, SupabaseStorageOptions};
