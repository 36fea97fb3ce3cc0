//! Common types used throughout chronicle.
//!
//! Everything here has a canonical binary encoding built on `commonware-codec`:
//! the same value always encodes to the same bytes, and decoding rejects any
//! input that would not re-encode identically.

pub mod action;
pub use action::{Action, Buy, Sell, TransferAsset};
pub mod address;
pub use address::Address;
pub mod asset;
pub use asset::{Currency, FungibleAssetValue};
pub mod codec;
pub mod constants;
pub mod error;
pub use error::{ActionError, Precondition};
pub mod execution;
pub use execution::{Event, Output, Transaction};
pub mod model;
