//! Read-only collaborators consulted during execution: static tables and the
//! principal registry.

use chronicle_types::{constants::AVATAR_DERIVE_PREFIX, Address};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SheetError {
    #[error("{sheet} has no row {id}")]
    NotFound { sheet: &'static str, id: u32 },
    #[error("{sheet} defines row {id} twice")]
    DuplicateRow { sheet: &'static str, id: u32 },
    #[error("invalid sheet json: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A static configuration table keyed by integer id.
pub trait TableSheet {
    type Row;

    fn row(&self, id: u32) -> Result<&Self::Row, SheetError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemRow {
    pub id: u32,
    #[serde(default)]
    pub tradable: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ItemSheet {
    rows: BTreeMap<u32, ItemRow>,
}

impl ItemSheet {
    const NAME: &'static str = "ItemSheet";

    pub fn new(rows: impl IntoIterator<Item = ItemRow>) -> Result<Self, SheetError> {
        let mut sheet = BTreeMap::new();
        for row in rows {
            let id = row.id;
            if sheet.insert(id, row).is_some() {
                return Err(SheetError::DuplicateRow {
                    sheet: Self::NAME,
                    id,
                });
            }
        }
        Ok(Self { rows: sheet })
    }

    /// Loads a JSON array of rows.
    pub fn from_json(json: &str) -> Result<Self, SheetError> {
        let rows: Vec<ItemRow> = serde_json::from_str(json)?;
        Self::new(rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TableSheet for ItemSheet {
    type Row = ItemRow;

    fn row(&self, id: u32) -> Result<&ItemRow, SheetError> {
        self.rows.get(&id).ok_or(SheetError::NotFound {
            sheet: Self::NAME,
            id,
        })
    }
}

/// Maps a principal to every address it may act for.
pub trait AccountRegistry: Send + Sync {
    fn resolve(&self, principal: &Address) -> BTreeSet<Address>;

    fn controls(&self, principal: &Address, address: &Address) -> bool {
        self.resolve(principal).contains(address)
    }
}

/// Resolves a principal to itself and its derived avatar addresses.
///
/// Needs no state access, so authorization can run before any read.
#[derive(Clone, Copy, Debug)]
pub struct DerivedRegistry {
    slots: u8,
}

impl DerivedRegistry {
    pub fn new(slots: u8) -> Self {
        Self { slots }
    }
}

impl AccountRegistry for DerivedRegistry {
    fn resolve(&self, principal: &Address) -> BTreeSet<Address> {
        std::iter::once(*principal)
            .chain(
                (0..self.slots)
                    .map(|slot| principal.derive(&format!("{AVATAR_DERIVE_PREFIX}{slot}"))),
            )
            .collect()
    }
}
