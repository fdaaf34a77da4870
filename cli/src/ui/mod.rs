//! UI Module
//!
//! Terminal presentation shell for the chat:
//!
//! - `app`: widget state, key handling and the event loop
//! - `views`: rendering of the toggle badge and the open panel
//!
//! No conversation logic lives here; every decision is made by the chat
//! reducer.

mod app;
mod views;

pub use app::{run_app, App};
