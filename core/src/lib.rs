/// Chatdesk - terminal chat client
/// 
/// Lists conversations, shows message threads and sends/receives messages
/// over a push channel, on top of a backend that serves the message history.

pub mod error;
pub mod config;
pub mod types;
pub mod timefmt;
pub mod conversations;
pub mod view;
pub mod controller;
pub mod history;
pub mod push;
pub mod session;
pub mod tui;
pub mod cli_app;

pub use error::{ChatError, Result};
pub use config::Config;
pub use controller::ChatController;
