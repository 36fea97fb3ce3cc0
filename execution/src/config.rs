use chronicle_types::constants::{
    AVATAR_SLOTS, MAILBOX_CAPACITY, MAX_AVATAR_SLOTS, MAX_MAILBOX_LENGTH, SHOP_FEE_PERCENT,
    SHOP_REQUIRED_STAGE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Tunable rules of the reference actions.
///
/// Every executor in a network must run with the same configuration; it is
/// an input to determinism just like the snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Fee taken by the current buy revision, in percent of the price.
    #[serde(default = "default_shop_fee_percent")]
    pub shop_fee_percent: u8,
    #[serde(default = "default_shop_required_stage")]
    pub shop_required_stage: u32,
    /// Avatar slots resolved per agent when authorizing avatar addresses.
    #[serde(default = "default_avatar_slots")]
    pub avatar_slots: u8,
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: usize },
    #[error("{field} must be <= {max} (got {value})")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            shop_fee_percent: default_shop_fee_percent(),
            shop_required_stage: default_shop_required_stage(),
            avatar_slots: default_avatar_slots(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

impl ExecutionConfig {
    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_at_most("shop_fee_percent", self.shop_fee_percent as usize, 100)?;
        ensure_nonzero("avatar_slots", self.avatar_slots as usize)?;
        ensure_at_most("avatar_slots", self.avatar_slots as usize, MAX_AVATAR_SLOTS)?;
        ensure_nonzero("mailbox_capacity", self.mailbox_capacity)?;
        ensure_at_most("mailbox_capacity", self.mailbox_capacity, MAX_MAILBOX_LENGTH)?;
        Ok(())
    }
}

fn default_shop_fee_percent() -> u8 {
    SHOP_FEE_PERCENT
}

fn default_shop_required_stage() -> u32 {
    SHOP_REQUIRED_STAGE
}

fn default_avatar_slots() -> u8 {
    AVATAR_SLOTS
}

fn default_mailbox_capacity() -> usize {
    MAILBOX_CAPACITY
}

fn ensure_nonzero(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

fn ensure_at_most(field: &'static str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::TooLarge { field, value, max });
    }
    Ok(())
}
