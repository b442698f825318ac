//! External service integrations.

pub mod local_storage;
pub mod pdf_renderer;
pub mod supabase_storage;

pub use local_storage::{LocalArtifactStorage, SignedUrlError};
pub use pdf_renderer::HttpPdfRenderer;
pub use supabase_storage::SupabaseStorage;
