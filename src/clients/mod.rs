pub mod error;
pub mod persistence_client;
pub mod sync_adapter;

pub use error::{ClientError, PersistenceError};
pub use persistence_client::{HttpPersistence, Persistence, SaveFuture};
pub use sync_adapter::{AdapterEvent, AdapterOptions, Identity, PeerPresence, SyncAdapter};
