//! Real-time collaboration relay for the wiki editor.
//!
//! Browser clients open one socket per document (`?d=<documentId>`). The
//! server keeps one in-memory session per open document with its current
//! content and presence table, and relays updates, cursors and presence to
//! the other members. Content is last-write-wins; durable saving is done by
//! the clients through the document API.

pub mod clients;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod websocket;
pub mod ws;

pub use state::AppState;
