//! Vidrelay-Store: the local directory file store.
//!
//! Media files live as plain files in a single directory and are addressed
//! by bare filename. There is no index: size and modification time are read
//! from filesystem metadata on every access.
//!
//! # Modules
//!
//! - `models` - Stored file metadata and operation outcomes
//! - `store` - The [`FileStore`] itself
//!
//! # Example
//!
//! ```no_run
//! use vidrelay_store::{DeleteOutcome, FileStore};
//!
//! # async fn demo() -> vidrelay_common::Result<()> {
//! let store = FileStore::new("/var/lib/vidrelay/downloads");
//! store.ensure_root().await?;
//!
//! if store.exists("clip.mp4").await {
//!     let stat = store.stat("clip.mp4").await?;
//!     println!("{} bytes", stat.size);
//! }
//!
//! match store.delete("clip.mp4").await? {
//!     DeleteOutcome::Deleted => println!("deleted"),
//!     DeleteOutcome::NotFound => println!("already gone"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod models;
pub mod store;

pub use models::{DeleteOutcome, FileStat, StoredFile};
pub use store::FileStore;
