//! Core types shared by the RepCRec transaction manager.
//!
//! This crate defines the foundational, allocation-light types used
//! throughout the system:
//! - [`TransactionId`], [`VarId`], [`SiteId`]: identity newtypes
//! - [`Clock`]: the global monotone event counter
//! - [`version::Version`]: an immutable committed version record
//! - [`error`]: the structural-error and dispatcher-error types
//!
//! Everything that can be derived from the specification's fixed constants
//! (ten sites, twenty variables, the even/odd replication rule) lives here
//! as compiled-in constants rather than runtime configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod types;
pub mod version;

pub use clock::Clock;
pub use error::{DispatchError, ManagerError};
pub use types::{SiteId, TransactionId, VarId, NUM_SITES, NUM_VARS};
pub use version::Version;
