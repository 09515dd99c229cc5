//! Per-visitor session state.
//!
//! Sessions live in memory, are identified by UUID and carry the chat
//! transcript, the latest search and the playback registry. Nothing
//! survives a restart.
//!
//! # Architecture
//!
//! - [`Session`]: one visitor's state
//! - [`SessionStore`]: thread-safe store for all active sessions
//!
//! # Example
//!
//! ```rust
//! use veda_explorer::chat::ChatMessage;
//! use veda_explorer::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let session = store.create();
//! session.push_chat(ChatMessage::User { text: "Hymns to Agni".into() });
//!
//! assert_eq!(session.chat_messages().len(), 1);
//! ```

mod thread;

pub use thread::{DEFAULT_SESSION_TIMEOUT, Session, SessionStore};
