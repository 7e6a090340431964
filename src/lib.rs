//! # Playlab - client for hosted conversational apps
//!
//! Tracks a conversation across calls, sends messages (optionally with a file
//! attached), lists history, resets to a fresh conversation and reloads old
//! ones by id. Generation and persistence happen on the service.
//!
//! ```no_run
//! # async fn demo() -> playlab::Result<()> {
//! use playlab::{Config, ConversationClient, Credentials};
//!
//! let credentials = Credentials::resolve(None, None, |name| std::env::var(name).ok())?;
//! let mut client = ConversationClient::connect(credentials, &Config::default())?;
//! let reply = client
//!     .send_message("Can you help me with solving quadratic equations?", None)
//!     .await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod attachment;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod retry;
pub mod session;
mod utils;

pub use api::{Message, MessageSource, PlaylabApi, Reply};
pub use config::{Config, Credentials, RenderMode};
pub use error::{PlaylabError, Result};
pub use session::ConversationClient;
