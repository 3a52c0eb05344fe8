//! Preview dispatch for glimpse.
//!
//! [`PreviewOrchestrator`] turns a selection of files (or an in-memory
//! object) into a rendered [`Preview`](glimpse_core::Preview):
//!
//! 1. resolve candidate handlers through the [`HandlerRegistry`](glimpse_registry::HandlerRegistry);
//! 2. pick one (explicit choice, favorite, stored preference, first);
//! 3. show the "creating" placeholder and render on a blocking task;
//! 4. swap the result in when its [`Completion`] is applied.
//!
//! Only one render runs at a time. Requests arriving meanwhile follow the
//! configured [`DispatchPolicy`](glimpse_core::DispatchPolicy).
//!
//! [`ArchiveBrowser`] lists archive entries and feeds extracted entries to
//! the orchestrator; [`list_directory`] produces the file list a browser
//! shows next to the preview.

mod archive;
mod browse;
mod error;
mod orchestrator;
mod render;

pub use archive::{ArchiveBrowser, TEMP_PREFIX};
pub use browse::list_directory;
pub use error::PreviewError;
pub use orchestrator::{DisplayOutcome, DisplayState, PreviewOrchestrator};
pub use render::{Completion, Ticket};
