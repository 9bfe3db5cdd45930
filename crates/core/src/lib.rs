pub mod affect;
pub mod entities;
pub mod faces;
pub mod intent;
pub mod notify;
pub mod pipeline;
pub mod reminder;
pub mod session;
pub mod store;
pub mod time;

/// Represents commands that the core logic issues to an external runtime.
///
/// This enum is the primary API for decoupling the dialogue engine's
/// decision-making from the runtime's execution of side effects. The runtime
/// decides how a spoken line actually reaches the user (text-to-speech, a UI
/// banner, or just the log).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Command the runtime to speak the given text to the user.
    SpeakText(String),
}
