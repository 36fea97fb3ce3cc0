use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use uuid::Uuid;

use super::Item;
use crate::{
    codec::{read_uuid, write_uuid, UUID_SIZE},
    FungibleAssetValue,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailKind {
    /// Delivered to the buyer; carries the purchased item.
    Buyer { product_id: Uuid, item: Item },
    /// Delivered to the seller; carries the proceeds after fees.
    Seller {
        product_id: Uuid,
        gold: FungibleAssetValue,
    },
}

/// A result record appended to an avatar's own mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mail {
    pub id: Uuid,
    pub block_index: u64,
    pub kind: MailKind,
}

impl Write for Mail {
    fn write(&self, writer: &mut impl BufMut) {
        write_uuid(&self.id, writer);
        self.block_index.write(writer);
        match &self.kind {
            MailKind::Buyer { product_id, item } => {
                0u8.write(writer);
                write_uuid(product_id, writer);
                item.write(writer);
            }
            MailKind::Seller { product_id, gold } => {
                1u8.write(writer);
                write_uuid(product_id, writer);
                gold.write(writer);
            }
        }
    }
}

impl Read for Mail {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let id = read_uuid(reader)?;
        let block_index = u64::read(reader)?;
        let kind = match u8::read(reader)? {
            0 => MailKind::Buyer {
                product_id: read_uuid(reader)?,
                item: Item::read(reader)?,
            },
            1 => MailKind::Seller {
                product_id: read_uuid(reader)?,
                gold: FungibleAssetValue::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(Self {
            id,
            block_index,
            kind,
        })
    }
}

impl EncodeSize for Mail {
    fn encode_size(&self) -> usize {
        UUID_SIZE
            + u64::SIZE
            + u8::SIZE
            + UUID_SIZE
            + match &self.kind {
                MailKind::Buyer { item, .. } => item.encode_size(),
                MailKind::Seller { gold, .. } => gold.encode_size(),
            }
    }
}
