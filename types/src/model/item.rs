use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use uuid::Uuid;

use crate::{
    codec::{read_uuid, write_uuid, UUID_SIZE},
    constants::MAX_INVENTORY_ITEMS,
    Precondition,
};

/// A tradable item instance. `sheet_id` points at its row in the item sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub sheet_id: u32,
    pub level: u8,
}

impl Write for Item {
    fn write(&self, writer: &mut impl BufMut) {
        write_uuid(&self.id, writer);
        self.sheet_id.write(writer);
        self.level.write(writer);
    }
}

impl Read for Item {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: read_uuid(reader)?,
            sheet_id: u32::read(reader)?,
            level: u8::read(reader)?,
        })
    }
}

impl FixedSize for Item {
    const SIZE: usize = UUID_SIZE + u32::SIZE + u8::SIZE;
}

/// Items held by an avatar, kept sorted by id so the encoding is canonical.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Inventory {
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Item> {
        self.position(id).ok().map(|idx| &self.items[idx])
    }

    /// Inserts `item`, replacing any item with the same id. A new item is
    /// refused once the inventory holds [`MAX_INVENTORY_ITEMS`].
    pub fn add(&mut self, item: Item) -> Result<(), Precondition> {
        match self.position(&item.id) {
            Ok(idx) => self.items[idx] = item,
            Err(_) if self.items.len() >= MAX_INVENTORY_ITEMS => {
                return Err(Precondition::InventoryFull {
                    capacity: MAX_INVENTORY_ITEMS,
                })
            }
            Err(idx) => self.items.insert(idx, item),
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Item> {
        self.position(id).ok().map(|idx| self.items.remove(idx))
    }

    fn position(&self, id: &Uuid) -> Result<usize, usize> {
        self.items.binary_search_by(|item| item.id.cmp(id))
    }
}

impl Write for Inventory {
    fn write(&self, writer: &mut impl BufMut) {
        self.items.write(writer);
    }
}

impl Read for Inventory {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let items = Vec::<Item>::read_range(reader, 0..=MAX_INVENTORY_ITEMS)?;
        if items.windows(2).any(|pair| pair[0].id >= pair[1].id) {
            return Err(Error::Invalid("Inventory", "items not sorted by id"));
        }
        Ok(Self { items })
    }
}

impl EncodeSize for Inventory {
    fn encode_size(&self) -> usize {
        self.items.encode_size()
    }
}
