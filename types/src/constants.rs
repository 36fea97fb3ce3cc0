/// Maximum length of a currency ticker
pub const MAX_TICKER_LENGTH: usize = 16;

/// Maximum decimal places a currency may declare
pub const MAX_DECIMAL_PLACES: u8 = 18;

/// Maximum length of an avatar name
pub const MAX_NAME_LENGTH: usize = 32;

/// Maximum length of a transfer memo
pub const MAX_MEMO_LENGTH: usize = 80;

/// Maximum number of items an inventory may hold
pub const MAX_INVENTORY_ITEMS: usize = 2_000;

/// Maximum number of products the shop may list; a full shop still fits in
/// one state value
pub const MAX_SHOP_PRODUCTS: usize = 30_000;

/// Maximum number of avatar slots per agent
pub const MAX_AVATAR_SLOTS: usize = 16;

/// Maximum encoded length of a single state value
pub const MAX_VALUE_LENGTH: usize = 4 * 1024 * 1024;

/// Maximum number of actions in a single batch
pub const MAX_BATCH_TRANSACTIONS: usize = 500;

/// Mails kept per avatar; older mails are dropped first
pub const MAILBOX_CAPACITY: usize = 30;

/// Upper bound on a decoded mailbox, regardless of configured capacity
pub const MAX_MAILBOX_LENGTH: usize = 256;

/// Avatar slots per agent
pub const AVATAR_SLOTS: u8 = 3;

/// Derivation key format for avatar addresses (`{agent}.derive("avatar-state-{slot}")`)
pub const AVATAR_DERIVE_PREFIX: &str = "avatar-state-";

/// Stage an avatar must have cleared before it may trade in the shop
pub const SHOP_REQUIRED_STAGE: u32 = 17;

/// Shop fee in percent of the listing price, routed to the gold currency address
pub const SHOP_FEE_PERCENT: u8 = 8;

/// Fixed fee of the legacy `buy3` revision
pub const LEGACY_SHOP_FEE_PERCENT: u8 = 8;

/// Last block at which `buy3` may execute
pub const BUY3_OBSOLETE_INDEX: u64 = 1_000_000;

/// Error codes carried by `ActionFailed` events
pub const ERROR_UNAUTHORIZED: u8 = 1;
pub const ERROR_OBSOLETED: u8 = 2;
pub const ERROR_STATE_LOAD_FAILURE: u8 = 3;
pub const ERROR_PRECONDITION_NOT_MET: u8 = 4;
pub const ERROR_INSUFFICIENT_BALANCE: u8 = 5;
pub const ERROR_CURRENCY_MISMATCH: u8 = 6;
pub const ERROR_SERIALIZATION: u8 = 7;

/// Maximum length of an error message carried by an `ActionFailed` event
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 256;
