//! Persona directive, memory templates and chat context assembly

pub mod context;
pub mod system;
pub mod templates;

pub use context::build_context;
pub use system::{DEFAULT_PERSONA, resolve_persona};
pub use templates::{summary_note, summary_prompt};
