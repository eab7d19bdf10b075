//! These models represent the objects passed between the flows and the
//! generation provider.
//!
//! There are a few related formats in play:
//! - openai-style messages/tools, sent from the generation client to the LLM
//! - tool calls and tool results, exchanged with the tool invocation bridge
//! - validated JSON values, handed back to the flow orchestrators
//!
//! Incoming and outgoing wire formats are converted to these internal
//! structs at the provider boundary (see `providers::utils`).
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
