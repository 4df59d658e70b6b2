//! External collaborators: Gemini narrative and Gmail mailbox

pub mod gemini;
pub mod gmail;
pub mod oauth;

pub use gemini::{GeminiClient, NarrativeProvider};
pub use gmail::{GmailConfig, GmailSource, MailSource};
