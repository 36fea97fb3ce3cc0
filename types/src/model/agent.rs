use std::collections::BTreeMap;

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};

use crate::{
    constants::{AVATAR_DERIVE_PREFIX, MAX_AVATAR_SLOTS},
    Address,
};

/// Account-level state: which avatar occupies which slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentState {
    pub address: Address,
    pub avatars: BTreeMap<u8, Address>,
}

impl AgentState {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            avatars: BTreeMap::new(),
        }
    }

    /// Address of the avatar in `slot`, whether or not it has been created.
    pub fn avatar_address(agent: &Address, slot: u8) -> Address {
        agent.derive(&format!("{AVATAR_DERIVE_PREFIX}{slot}"))
    }

    /// Records the derived avatar address for `slot` and returns it.
    pub fn claim_slot(&mut self, slot: u8) -> Address {
        let address = Self::avatar_address(&self.address, slot);
        self.avatars.insert(slot, address);
        address
    }
}

impl Write for AgentState {
    fn write(&self, writer: &mut impl BufMut) {
        self.address.write(writer);
        (self.avatars.len() as u8).write(writer);
        for (slot, avatar) in &self.avatars {
            slot.write(writer);
            avatar.write(writer);
        }
    }
}

impl Read for AgentState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let address = Address::read(reader)?;
        let count = u8::read(reader)? as usize;
        if count > MAX_AVATAR_SLOTS {
            return Err(Error::Invalid("AgentState", "too many avatars"));
        }
        let mut avatars = BTreeMap::new();
        let mut last = None;
        for _ in 0..count {
            let slot = u8::read(reader)?;
            if last.is_some_and(|prev| prev >= slot) {
                return Err(Error::Invalid("AgentState", "slots not sorted"));
            }
            last = Some(slot);
            avatars.insert(slot, Address::read(reader)?);
        }
        Ok(Self { address, avatars })
    }
}

impl EncodeSize for AgentState {
    fn encode_size(&self) -> usize {
        Address::SIZE + u8::SIZE + self.avatars.len() * (u8::SIZE + Address::SIZE)
    }
}
