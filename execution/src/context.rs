use crate::{
    config::ExecutionConfig,
    external::{AccountRegistry, ItemSheet},
    state::{Delta, State},
    Random,
};
use chronicle_types::{Address, Event};
use std::collections::{btree_set, BTreeSet};

/// Inputs of a single action invocation. Built once, never persisted.
pub struct ActionContext<'a, S: State> {
    pub previous: &'a S,
    pub signer: Address,
    pub block_index: u64,
    pub random: Random,
    /// When set, execution only marks the addresses it could touch.
    pub rehearsal: bool,
}

impl<'a, S: State> ActionContext<'a, S> {
    pub fn new(previous: &'a S, signer: Address, block_index: u64, random: Random) -> Self {
        Self {
            previous,
            signer,
            block_index,
            random,
            rehearsal: false,
        }
    }

    pub fn rehearsal(mut self) -> Self {
        self.rehearsal = true;
        self
    }
}

/// Collaborators shared by every action in a batch.
#[derive(Clone, Copy)]
pub struct Environment<'e> {
    pub config: &'e ExecutionConfig,
    pub items: &'e ItemSheet,
    pub accounts: &'e dyn AccountRegistry,
}

/// Result of a successful invocation: the action's own overlay and the
/// events it emitted.
pub struct Outcome<'a, S: State> {
    pub delta: Delta<'a, S>,
    pub events: Vec<Event>,
}

/// Addresses an action may read or write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Footprint(BTreeSet<Address>);

impl Footprint {
    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains(address)
    }

    pub fn intersects(&self, other: &Footprint) -> bool {
        let (small, large) = if self.0.len() <= other.0.len() {
            (&self.0, &other.0)
        } else {
            (&other.0, &self.0)
        };
        small.iter().any(|address| large.contains(address))
    }

    pub fn covers(&self, accessed: &BTreeSet<Address>) -> bool {
        accessed.is_subset(&self.0)
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Address> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Address> for Footprint {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeSet<Address>> for Footprint {
    fn from(addresses: BTreeSet<Address>) -> Self {
        Self(addresses)
    }
}
