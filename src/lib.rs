//! Local chat page in front of a retrieval-augmented assistant.
//!
//! The assistant is built from a configuration file materialized from a
//! template, inside a throwaway storage directory, and then fed prompts from a
//! server-rendered page. See [`session::Session`] for the interaction flow.

pub mod assistant;
pub mod conversation;
pub mod core;
pub mod server;
pub mod session;
pub mod state;
pub mod template;
