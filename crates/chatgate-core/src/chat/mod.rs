//! Chat orchestration: moderation, session lease, inference, commit.

pub mod orchestrator;
pub mod stream;

pub use orchestrator::{ChatOrchestrator, ChatSettings};
pub use stream::ReplyStream;
