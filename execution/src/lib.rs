//! Chronicle execution layer.
//!
//! This crate runs signed actions against address-keyed state: asset
//! transfers, shop listings and purchases. Every action executes on its own
//! [`Delta`] over the previous state and either yields that overlay plus its
//! events, or fails and leaves nothing behind.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution; `block_index` is the only clock.
//! - Randomness comes from [`Random`], seeded by the block index, the
//!   transaction position, the signer and the action payload.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!   State, changes and snapshots are `BTreeMap`-backed.
//!
//! ## Concurrency
//! Actions can be rehearsed to a [`Footprint`] without reading state.
//! [`schedule::execute_block`] groups transactions with disjoint footprints
//! into waves (in parallel with the `parallel` feature) and produces the same
//! snapshot and outputs as running the block through a [`Layer`].
//!
//! ## Minimal execution pipeline (example)
//! ```rust,ignore
//! use chronicle_execution::{mocks::Fixture, Layer, Snapshot};
//!
//! let fixture = Fixture::default();
//! let genesis: Snapshot = fixture.genesis(|_| {});
//! let mut layer = Layer::new(&genesis, fixture.env(), 1);
//! let outputs = layer.execute(transactions)?;
//! let next = layer.commit();
//! println!("root {:?}", next.root());
//! ```

pub mod config;
pub mod context;
pub mod external;
pub mod random;
pub mod schedule;
pub mod state;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod layer;

#[cfg(test)]
mod scenario_tests;

pub use config::{ConfigError, ExecutionConfig};
pub use context::{ActionContext, Environment, Footprint, Outcome};
pub use external::{AccountRegistry, DerivedRegistry, ItemRow, ItemSheet, SheetError, TableSheet};
pub use layer::{execute, rehearse, Layer};
pub use random::Random;
pub use schedule::{execute_block, plan, BlockOutcome};
pub use state::{Changes, Delta, MergeConflict, Snapshot, State, Status};
