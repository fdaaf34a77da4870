//! Conversation State Machine
//!
//! The chat is driven by a pure reducer: `reduce(&mut Conversation, Event)`
//! updates the conversation and returns the `Effect`s (lookups, link
//! opening) the runtime should perform. Lookup completions come back as
//! events carrying the request token they were issued with; responses to
//! superseded requests are dropped.

pub mod format;
pub mod menu;
pub mod reducer;
pub mod runtime;
pub mod state;

pub use menu::{MenuChoice, MenuView};
pub use reducer::reduce;
pub use runtime::EffectRunner;
pub use state::{Conversation, Event, Sender, Turn};
