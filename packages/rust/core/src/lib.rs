//! Content generation pipeline for ContentForge.
//!
//! Fetches a source page, gathers related content, asks a language model for
//! an outline and expands each outline section into Markdown prose.

mod events;
mod expand;
mod outline;
mod pipeline;
pub mod prompts;
mod session;

#[cfg(test)]
mod testing;

pub use events::{LogSink, MemoryLog, SilentLog};
pub use pipeline::{Pipeline, RunState};
pub use session::{Backend, GenerationSession, HttpBackend, Providers, SessionState};
