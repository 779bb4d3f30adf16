//! Remote-API layer for Adjutant.
//!
//! Everything that talks to the Assistants API lives here: the transport
//! client, the per-resource operations, the run orchestrator that drives a
//! conversational turn, and configuration loading.

pub mod config;
pub mod orchestrator;
pub mod resources;
pub mod transport;

pub use config::ApiConfig;
pub use orchestrator::{AssistantReply, PollPolicy, RunOrchestrator};
pub use resources::{AssistantsClient, CreateAssistant, Tool};
pub use transport::{HttpTransport, Transport};
