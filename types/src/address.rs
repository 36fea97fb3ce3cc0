//! Fixed-width state addresses.

use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, Write};
use commonware_cryptography::{sha256::Sha256, Hasher};
use commonware_utils::hex;
use std::fmt;

/// A 20-byte identifier naming a slot in the state store or balance table.
///
/// Addresses are either supplied by external key material or derived from a
/// parent with [`Address::derive`], which lets entities namespace their
/// sub-state without a central allocator.
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address([u8; Address::LEN]);

impl Address {
    pub const LEN: usize = 20;

    /// Shared product listing table.
    pub const SHOP: Self = Self::system(0x01);

    /// Holds the gold currency definition and collects trading fees.
    pub const GOLD_CURRENCY: Self = Self::system(0x04);

    const fn system(tag: u8) -> Self {
        let mut bytes = [0u8; Self::LEN];
        bytes[Self::LEN - 1] = tag;
        Self(bytes)
    }

    pub const fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Builds an address from the leading bytes of a SHA-256 digest of `material`.
    pub fn from_material(material: &[u8]) -> Self {
        Self::truncate(Sha256::hash(material).as_ref())
    }

    /// Derives a child address from this address and `key`.
    ///
    /// The result is a pure function of `(self, key)`.
    pub fn derive(&self, key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&self.0);
        hasher.update(key.as_bytes());
        Self::truncate(hasher.finalize().as_ref())
    }

    fn truncate(digest: &[u8]) -> Self {
        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&digest[..Self::LEN]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Write for Address {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for Address {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < Self::LEN {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = [0u8; Self::LEN];
        reader.copy_to_slice(&mut bytes);
        Ok(Self(bytes))
    }
}

impl FixedSize for Address {
    const SIZE: usize = Self::LEN;
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt as _, Encode};

    #[test]
    fn derive_is_pure() {
        let parent = Address::from_material(b"agent");
        assert_eq!(parent.derive("avatar-state-0"), parent.derive("avatar-state-0"));
        assert_ne!(parent.derive("avatar-state-0"), parent.derive("avatar-state-1"));
        assert_ne!(parent.derive("inventory"), parent);
    }

    #[test]
    fn derive_depends_on_parent() {
        let a = Address::from_material(b"a");
        let b = Address::from_material(b"b");
        assert_ne!(a.derive("inventory"), b.derive("inventory"));
    }

    #[test]
    fn system_addresses_are_distinct() {
        assert_ne!(Address::SHOP, Address::GOLD_CURRENCY);
        assert_eq!(Address::SHOP.as_bytes()[Address::LEN - 1], 0x01);
    }

    #[test]
    fn codec_is_fixed_width() {
        let address = Address::from_material(b"agent");
        let encoded = address.encode();
        assert_eq!(encoded.len(), Address::SIZE);
        assert_eq!(Address::decode(encoded.as_ref()).unwrap(), address);
        assert!(matches!(
            Address::decode(&encoded[..Address::LEN - 1]),
            Err(Error::EndOfBuffer)
        ));
    }

    #[test]
    fn display_is_prefixed_hex() {
        let rendered = Address::SHOP.to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 2 + Address::LEN * 2);
        assert!(rendered.ends_with("01"));
    }
}
