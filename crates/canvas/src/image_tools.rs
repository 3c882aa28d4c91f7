//! The image generation tools offered to the model: text to image, virtual
//! try-on, style transfer and the option listing.
//!
//! Validation happens here, before the image model is called. Failures the model
//! should see are returned as `{"success": false, ...}` payloads rather than as
//! errors, so they travel through the normal result path to the UI.
pub mod failure;
pub mod generation;
pub mod model;
pub mod options;
pub mod prompt;
mod system;

pub use failure::{FailureKind, ToolFailure};
pub use system::CanvasSystem;
