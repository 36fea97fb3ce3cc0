//! The closed registry of actions.
//!
//! Each action kind owns a tag byte. Revisions of the same action are distinct
//! variants with their own valid block range; they are never merged behind a
//! version flag.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use uuid::Uuid;

use crate::{
    codec::{read_string, read_uuid, string_encode_size, write_string, write_uuid, UUID_SIZE},
    constants::{BUY3_OBSOLETE_INDEX, MAX_MEMO_LENGTH},
    Address, FungibleAssetValue, Precondition,
};

/// Longest memo in bytes: [`MAX_MEMO_LENGTH`] characters of up to four bytes.
const MAX_MEMO_BYTES: usize = MAX_MEMO_LENGTH * 4;

/// Moves an amount between two balances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferAsset {
    pub sender: Address,
    pub recipient: Address,
    pub amount: FungibleAssetValue,
    /// At most [`MAX_MEMO_LENGTH`] characters.
    pub memo: Option<String>,
}

impl TransferAsset {
    /// Fails if the memo is longer than [`MAX_MEMO_LENGTH`] characters.
    pub fn check_memo(&self) -> Result<(), Precondition> {
        match &self.memo {
            Some(memo) if memo.chars().count() > MAX_MEMO_LENGTH => {
                Err(Precondition::MemoTooLong {
                    max: MAX_MEMO_LENGTH,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Lists an inventory item in the shop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sell {
    pub seller_avatar: Address,
    pub item_id: Uuid,
    pub price: FungibleAssetValue,
}

/// Buys a listed product. Shared by every buy revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buy {
    pub buyer_avatar: Address,
    pub seller_agent: Address,
    pub seller_avatar: Address,
    pub product_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Binary: [0] [sender:20] [recipient:20] [amount] [hasMemo:u8] ([memoLen:u32 BE] [memo...])?
    TransferAsset(TransferAsset),

    /// Binary: [1] [sellerAvatar:20] [itemId:16] [price]
    Sell(Sell),

    /// Legacy buy with a fixed fee. Rejected after `BUY3_OBSOLETE_INDEX`.
    /// Binary: [2] [buyerAvatar:20] [sellerAgent:20] [sellerAvatar:20] [productId:16]
    Buy3(Buy),

    /// Binary: [3] [buyerAvatar:20] [sellerAgent:20] [sellerAvatar:20] [productId:16]
    Buy(Buy),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransferAsset(_) => "transfer_asset",
            Self::Sell(_) => "sell",
            Self::Buy3(_) => "buy3",
            Self::Buy(_) => "buy",
        }
    }

    /// Last block index at which this action may execute, if it is bounded.
    pub fn obsolete_index(&self) -> Option<u64> {
        match self {
            Self::Buy3(_) => Some(BUY3_OBSOLETE_INDEX),
            _ => None,
        }
    }

    pub fn is_obsolete(&self, block_index: u64) -> bool {
        self.obsolete_index()
            .is_some_and(|obsolete_index| block_index > obsolete_index)
    }
}

impl Write for TransferAsset {
    fn write(&self, writer: &mut impl BufMut) {
        self.sender.write(writer);
        self.recipient.write(writer);
        self.amount.write(writer);
        self.memo.is_some().write(writer);
        if let Some(memo) = &self.memo {
            write_string(memo, writer);
        }
    }
}

impl Read for TransferAsset {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let sender = Address::read(reader)?;
        let recipient = Address::read(reader)?;
        let amount = FungibleAssetValue::read(reader)?;
        let memo = if bool::read(reader)? {
            Some(read_string(reader, MAX_MEMO_BYTES)?)
        } else {
            None
        };
        let transfer = Self {
            sender,
            recipient,
            amount,
            memo,
        };
        transfer
            .check_memo()
            .map_err(|_| Error::Invalid("TransferAsset", "memo too long"))?;
        Ok(transfer)
    }
}

impl EncodeSize for TransferAsset {
    fn encode_size(&self) -> usize {
        Address::SIZE * 2
            + self.amount.encode_size()
            + u8::SIZE
            + self.memo.as_deref().map_or(0, string_encode_size)
    }
}

impl Write for Sell {
    fn write(&self, writer: &mut impl BufMut) {
        self.seller_avatar.write(writer);
        write_uuid(&self.item_id, writer);
        self.price.write(writer);
    }
}

impl Read for Sell {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            seller_avatar: Address::read(reader)?,
            item_id: read_uuid(reader)?,
            price: FungibleAssetValue::read(reader)?,
        })
    }
}

impl EncodeSize for Sell {
    fn encode_size(&self) -> usize {
        Address::SIZE + UUID_SIZE + self.price.encode_size()
    }
}

impl Write for Buy {
    fn write(&self, writer: &mut impl BufMut) {
        self.buyer_avatar.write(writer);
        self.seller_agent.write(writer);
        self.seller_avatar.write(writer);
        write_uuid(&self.product_id, writer);
    }
}

impl Read for Buy {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            buyer_avatar: Address::read(reader)?,
            seller_agent: Address::read(reader)?,
            seller_avatar: Address::read(reader)?,
            product_id: read_uuid(reader)?,
        })
    }
}

impl FixedSize for Buy {
    const SIZE: usize = Address::SIZE * 3 + UUID_SIZE;
}

impl Write for Action {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::TransferAsset(action) => {
                0u8.write(writer);
                action.write(writer);
            }
            Self::Sell(action) => {
                1u8.write(writer);
                action.write(writer);
            }
            Self::Buy3(action) => {
                2u8.write(writer);
                action.write(writer);
            }
            Self::Buy(action) => {
                3u8.write(writer);
                action.write(writer);
            }
        }
    }
}

impl Read for Action {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let action = match u8::read(reader)? {
            0 => Self::TransferAsset(TransferAsset::read(reader)?),
            1 => Self::Sell(Sell::read(reader)?),
            2 => Self::Buy3(Buy::read(reader)?),
            3 => Self::Buy(Buy::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(action)
    }
}

impl EncodeSize for Action {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::TransferAsset(action) => action.encode_size(),
                Self::Sell(action) => action.encode_size(),
                Self::Buy3(action) | Self::Buy(action) => action.encode_size(),
            }
    }
}
