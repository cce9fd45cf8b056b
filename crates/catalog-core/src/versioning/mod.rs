//! Entity versioning for audit trails and reverts.
//!
//! Each mutation writes a new immutable version row, enabling queries like
//! "what did this product look like last month?" and copying an old state
//! forward as the new current one.

mod store;
mod version;

pub use store::{open_connection, SharedConnection, SqliteVersionStore, VersionStore};
pub(crate) use store::lock;
pub use version::{ChangeKind, EntityVersion, VersionedEntity, INITIAL_VERSION};
