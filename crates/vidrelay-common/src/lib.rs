//! Vidrelay-Common: Shared error type and filename utilities.
//!
//! - **Error Handling**: the [`Error`] taxonomy shared by the store, the
//!   streaming responder and the retention scheduler
//! - **Path Utilities**: filename sanitization, validation and content-type
//!   detection
//!
//! # Examples
//!
//! ```
//! use vidrelay_common::{Error, Result};
//! use vidrelay_common::paths::sanitize_title;
//!
//! assert_eq!(sanitize_title("a/b:c?"), "abc");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("clip.mp4"))
//! }
//! ```

pub mod error;
pub mod paths;

pub use error::{Error, Result};
