//! Closed failure taxonomy surfaced by action execution.
//!
//! Every variant is fatal to the invocation that produced it: the surrounding
//! delta is discarded and the error is handed to the caller verbatim. Whether to
//! retry is a decision for the scheduler, never for the core.

use crate::{
    constants::{
        ERROR_CURRENCY_MISMATCH, ERROR_INSUFFICIENT_BALANCE, ERROR_OBSOLETED,
        ERROR_PRECONDITION_NOT_MET, ERROR_SERIALIZATION, ERROR_STATE_LOAD_FAILURE,
        ERROR_UNAUTHORIZED,
    },
    Address, Currency, FungibleAssetValue,
};
use thiserror::Error as ThisError;
use uuid::Uuid;

/// A domain-level condition that did not hold.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Precondition {
    #[error("stage {required} must be cleared (last cleared: {cleared})")]
    StageNotCleared { required: u32, cleared: u32 },
    #[error("product {product_id} is not listed by {seller_agent}")]
    ProductNotFound {
        seller_agent: Address,
        product_id: Uuid,
    },
    #[error("item {item_id} is not in the inventory")]
    ItemNotFound { item_id: Uuid },
    #[error("item sheet row {sheet_id} is not tradable")]
    ItemNotTradable { sheet_id: u32 },
    #[error("product {product_id} is already listed")]
    DuplicateProduct { product_id: Uuid },
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("sender and recipient are both {0}")]
    SelfTransfer(Address),
    #[error("amount arithmetic out of range")]
    AmountOutOfRange,
    #[error("inventory already holds {capacity} items")]
    InventoryFull { capacity: usize },
    #[error("shop already lists {capacity} products")]
    ShopFull { capacity: usize },
    #[error("memo is longer than {max} characters")]
    MemoTooLong { max: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ActionError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{action} is obsolete since block #{obsolete_index} (current block #{block_index})")]
    Obsoleted {
        action: &'static str,
        obsolete_index: u64,
        block_index: u64,
    },
    #[error("failed to load state: {0}")]
    StateLoadFailure(String),
    #[error("precondition not met: {0}")]
    PreconditionNotMet(Precondition),
    #[error("insufficient balance at {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: Address,
        required: FungibleAssetValue,
        available: FungibleAssetValue,
    },
    #[error("currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ActionError {
    /// Stable numeric category, carried by failure records.
    pub fn code(&self) -> u8 {
        match self {
            Self::Unauthorized(_) => ERROR_UNAUTHORIZED,
            Self::Obsoleted { .. } => ERROR_OBSOLETED,
            Self::StateLoadFailure(_) => ERROR_STATE_LOAD_FAILURE,
            Self::PreconditionNotMet(_) => ERROR_PRECONDITION_NOT_MET,
            Self::InsufficientBalance { .. } => ERROR_INSUFFICIENT_BALANCE,
            Self::CurrencyMismatch { .. } => ERROR_CURRENCY_MISMATCH,
            Self::Serialization(_) => ERROR_SERIALIZATION,
        }
    }
}

impl From<Precondition> for ActionError {
    fn from(condition: Precondition) -> Self {
        Self::PreconditionNotMet(condition)
    }
}

impl From<commonware_codec::Error> for ActionError {
    fn from(err: commonware_codec::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
