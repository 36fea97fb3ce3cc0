use std::collections::BTreeMap;

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use uuid::Uuid;

use super::Item;
use crate::{
    codec::{read_uuid, write_uuid, UUID_SIZE},
    constants::MAX_SHOP_PRODUCTS,
    Address, FungibleAssetValue, Precondition,
};

/// A single listing in the shared shop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopItem {
    pub seller_agent: Address,
    pub seller_avatar: Address,
    pub product_id: Uuid,
    pub price: FungibleAssetValue,
    pub item: Item,
    pub registered_at: u64,
}

impl Write for ShopItem {
    fn write(&self, writer: &mut impl BufMut) {
        self.seller_agent.write(writer);
        self.seller_avatar.write(writer);
        write_uuid(&self.product_id, writer);
        self.price.write(writer);
        self.item.write(writer);
        self.registered_at.write(writer);
    }
}

impl Read for ShopItem {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            seller_agent: Address::read(reader)?,
            seller_avatar: Address::read(reader)?,
            product_id: read_uuid(reader)?,
            price: FungibleAssetValue::read(reader)?,
            item: Item::read(reader)?,
            registered_at: u64::read(reader)?,
        })
    }
}

impl EncodeSize for ShopItem {
    fn encode_size(&self) -> usize {
        Address::SIZE * 2
            + UUID_SIZE
            + self.price.encode_size()
            + Item::SIZE
            + self.registered_at.encode_size()
    }
}

/// The shared listing table, stored as one entry at [`Address::SHOP`].
///
/// Products are keyed by product id. Every buy or sell reads and rewrites the
/// whole table, so any two shop actions conflict by address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShopState {
    products: BTreeMap<Uuid, ShopItem>,
}

impl ShopState {
    pub fn products(&self) -> impl Iterator<Item = &ShopItem> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Looks up a listing, requiring it to belong to `seller_agent`.
    pub fn try_get(&self, seller_agent: &Address, product_id: &Uuid) -> Option<&ShopItem> {
        self.products
            .get(product_id)
            .filter(|listing| &listing.seller_agent == seller_agent)
    }

    /// Adds a listing. The table is left unchanged if the product id is taken
    /// or [`MAX_SHOP_PRODUCTS`] are already listed.
    pub fn register(&mut self, listing: ShopItem) -> Result<(), Precondition> {
        if self.products.contains_key(&listing.product_id) {
            return Err(Precondition::DuplicateProduct {
                product_id: listing.product_id,
            });
        }
        if self.products.len() >= MAX_SHOP_PRODUCTS {
            return Err(Precondition::ShopFull {
                capacity: MAX_SHOP_PRODUCTS,
            });
        }
        self.products.insert(listing.product_id, listing);
        Ok(())
    }

    pub fn unregister(&mut self, product_id: &Uuid) -> Option<ShopItem> {
        self.products.remove(product_id)
    }
}

impl Write for ShopState {
    fn write(&self, writer: &mut impl BufMut) {
        (self.products.len() as u32).write(writer);
        for listing in self.products.values() {
            listing.write(writer);
        }
    }
}

impl Read for ShopState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let count = u32::read(reader)? as usize;
        if count > MAX_SHOP_PRODUCTS {
            return Err(Error::Invalid("ShopState", "too many products"));
        }
        let mut products = BTreeMap::new();
        let mut last: Option<Uuid> = None;
        for _ in 0..count {
            let listing = ShopItem::read(reader)?;
            if last.is_some_and(|prev| prev >= listing.product_id) {
                return Err(Error::Invalid("ShopState", "products not sorted"));
            }
            last = Some(listing.product_id);
            products.insert(listing.product_id, listing);
        }
        Ok(Self { products })
    }
}

impl EncodeSize for ShopState {
    fn encode_size(&self) -> usize {
        u32::SIZE
            + self
                .products
                .values()
                .map(EncodeSize::encode_size)
                .sum::<usize>()
    }
}
