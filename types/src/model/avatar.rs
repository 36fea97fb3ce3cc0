use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};

use super::{Inventory, Mail};
use crate::{
    codec::{read_string, string_encode_size, write_string},
    constants::{MAX_MAILBOX_LENGTH, MAX_NAME_LENGTH},
    Address, FungibleAssetValue,
};

/// Trade counters fed by every buy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TradeQuest {
    pub bought: u64,
    pub sold: u64,
    /// Raw gold amount exchanged across all trades.
    pub gold_traded: u128,
}

impl TradeQuest {
    /// Counts a purchase at `price`. Counters saturate.
    pub fn record_buy(&mut self, price: &FungibleAssetValue) {
        self.bought = self.bought.saturating_add(1);
        self.gold_traded = self.gold_traded.saturating_add(price.raw);
    }

    /// Counts a sale at `price`.
    pub fn record_sell(&mut self, price: &FungibleAssetValue) {
        self.sold = self.sold.saturating_add(1);
        self.gold_traded = self.gold_traded.saturating_add(price.raw);
    }
}

impl Write for TradeQuest {
    fn write(&self, writer: &mut impl BufMut) {
        self.bought.write(writer);
        self.sold.write(writer);
        self.gold_traded.write(writer);
    }
}

impl Read for TradeQuest {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            bought: u64::read(reader)?,
            sold: u64::read(reader)?,
            gold_traded: u128::read(reader)?,
        })
    }
}

impl FixedSize for TradeQuest {
    const SIZE: usize = u64::SIZE + u64::SIZE + u128::SIZE;
}

/// Per-character state stored at the avatar's derived address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvatarState {
    pub address: Address,
    pub agent_address: Address,
    pub name: String,
    pub cleared_stage: u32,
    pub inventory: Inventory,
    /// Oldest first.
    pub mailbox: Vec<Mail>,
    pub trade_quest: TradeQuest,
    pub updated_at: u64,
}

impl AvatarState {
    pub fn new(address: Address, agent_address: Address, name: String, block_index: u64) -> Self {
        Self {
            address,
            agent_address,
            name,
            cleared_stage: 0,
            inventory: Inventory::default(),
            mailbox: Vec::new(),
            trade_quest: TradeQuest::default(),
            updated_at: block_index,
        }
    }

    pub fn is_stage_cleared(&self, stage: u32) -> bool {
        self.cleared_stage >= stage
    }

    /// Appends `mail`, dropping the oldest mails beyond `capacity`.
    pub fn deliver(&mut self, mail: Mail, capacity: usize) {
        self.mailbox.push(mail);
        let capacity = capacity.min(MAX_MAILBOX_LENGTH);
        if self.mailbox.len() > capacity {
            let excess = self.mailbox.len() - capacity;
            self.mailbox.drain(..excess);
        }
    }
}

impl Write for AvatarState {
    fn write(&self, writer: &mut impl BufMut) {
        self.address.write(writer);
        self.agent_address.write(writer);
        write_string(&self.name, writer);
        self.cleared_stage.write(writer);
        self.inventory.write(writer);
        self.mailbox.write(writer);
        self.trade_quest.write(writer);
        self.updated_at.write(writer);
    }
}

impl Read for AvatarState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            address: Address::read(reader)?,
            agent_address: Address::read(reader)?,
            name: read_string(reader, MAX_NAME_LENGTH)?,
            cleared_stage: u32::read(reader)?,
            inventory: Inventory::read(reader)?,
            mailbox: Vec::<Mail>::read_range(reader, 0..=MAX_MAILBOX_LENGTH)?,
            trade_quest: TradeQuest::read(reader)?,
            updated_at: u64::read(reader)?,
        })
    }
}

impl EncodeSize for AvatarState {
    fn encode_size(&self) -> usize {
        Address::SIZE
            + Address::SIZE
            + string_encode_size(&self.name)
            + self.cleared_stage.encode_size()
            + self.inventory.encode_size()
            + self.mailbox.encode_size()
            + TradeQuest::SIZE
            + self.updated_at.encode_size()
    }
}
