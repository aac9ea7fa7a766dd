/// nexo-core: client-side conversation and messaging synchronization engine
///
/// Maintains a consistent local view of conversations, messages, group
/// membership, read state and block relationships from two inputs feeding one
/// merge path: REST responses and realtime push events. All state lives inside
/// a [`Session`] and is discarded on logout.
pub mod api;
pub mod blocks;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod permissions;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod types;
pub mod unread;

pub use config::Config;
pub use error::{Result, SyncError};
pub use session::Session;
