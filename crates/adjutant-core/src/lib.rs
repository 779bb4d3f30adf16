pub mod error;
pub mod message;
pub mod run;
pub mod session;

// Re-export common error type
pub use error::{AdjutantError, Result};
pub use run::RunStatus;
pub use session::{Session, UploadedFileRef};
