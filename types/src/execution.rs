use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use uuid::Uuid;

use crate::{
    codec::{read_string, read_uuid, string_encode_size, write_string, write_uuid, UUID_SIZE},
    constants::MAX_ERROR_MESSAGE_LENGTH,
    Action, Address, FungibleAssetValue,
};

/// An action submitted on behalf of `signer`.
///
/// Authentication of the signer happens upstream; execution only sees the
/// resolved principal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub signer: Address,
    pub action: Action,
}

impl Transaction {
    pub fn new(signer: Address, action: Action) -> Self {
        Self { signer, action }
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.signer.write(writer);
        self.action.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            signer: Address::read(reader)?,
            action: Action::read(reader)?,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        Address::SIZE + self.action.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    AssetTransferred {
        sender: Address,
        recipient: Address,
        amount: FungibleAssetValue,
    },
    ProductRegistered {
        seller_avatar: Address,
        product_id: Uuid,
        price: FungibleAssetValue,
    },
    ProductSold {
        buyer_avatar: Address,
        seller_agent: Address,
        product_id: Uuid,
        price: FungibleAssetValue,
        fee: FungibleAssetValue,
    },
    /// A transaction was rejected; none of its writes were kept.
    ActionFailed {
        signer: Address,
        error_code: u8,
        message: String,
    },
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::AssetTransferred {
                sender,
                recipient,
                amount,
            } => {
                0u8.write(writer);
                sender.write(writer);
                recipient.write(writer);
                amount.write(writer);
            }
            Self::ProductRegistered {
                seller_avatar,
                product_id,
                price,
            } => {
                1u8.write(writer);
                seller_avatar.write(writer);
                write_uuid(product_id, writer);
                price.write(writer);
            }
            Self::ProductSold {
                buyer_avatar,
                seller_agent,
                product_id,
                price,
                fee,
            } => {
                2u8.write(writer);
                buyer_avatar.write(writer);
                seller_agent.write(writer);
                write_uuid(product_id, writer);
                price.write(writer);
                fee.write(writer);
            }
            Self::ActionFailed {
                signer,
                error_code,
                message,
            } => {
                3u8.write(writer);
                signer.write(writer);
                error_code.write(writer);
                write_string(message, writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match u8::read(reader)? {
            0 => Self::AssetTransferred {
                sender: Address::read(reader)?,
                recipient: Address::read(reader)?,
                amount: FungibleAssetValue::read(reader)?,
            },
            1 => Self::ProductRegistered {
                seller_avatar: Address::read(reader)?,
                product_id: read_uuid(reader)?,
                price: FungibleAssetValue::read(reader)?,
            },
            2 => Self::ProductSold {
                buyer_avatar: Address::read(reader)?,
                seller_agent: Address::read(reader)?,
                product_id: read_uuid(reader)?,
                price: FungibleAssetValue::read(reader)?,
                fee: FungibleAssetValue::read(reader)?,
            },
            3 => Self::ActionFailed {
                signer: Address::read(reader)?,
                error_code: u8::read(reader)?,
                message: read_string(reader, MAX_ERROR_MESSAGE_LENGTH)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::AssetTransferred { amount, .. } => Address::SIZE * 2 + amount.encode_size(),
                Self::ProductRegistered { price, .. } => {
                    Address::SIZE + UUID_SIZE + price.encode_size()
                }
                Self::ProductSold { price, fee, .. } => {
                    Address::SIZE * 2 + UUID_SIZE + price.encode_size() + fee.encode_size()
                }
                Self::ActionFailed { message, .. } => {
                    Address::SIZE + u8::SIZE + string_encode_size(message)
                }
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Event(Event),
    Transaction(Transaction),
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Event(event) => {
                0u8.write(writer);
                event.write(writer);
            }
            Self::Transaction(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Event(Event::read(reader)?)),
            1 => Ok(Self::Transaction(Transaction::read(reader)?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Event(event) => event.encode_size(),
            Self::Transaction(transaction) => transaction.encode_size(),
        }
    }
}
