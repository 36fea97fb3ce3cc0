use bytes::{Buf, BufMut, Bytes};
use commonware_codec::{Error, FixedSize, ReadExt, Write};
use uuid::Uuid;

/// Encoded width of a [`Uuid`].
pub const UUID_SIZE: usize = 16;

/// Writes `value` as a big-endian `u32` byte count followed by its UTF-8 bytes.
pub fn write_string(value: &str, writer: &mut impl BufMut) {
    (value.len() as u32).write(writer);
    writer.put_slice(value.as_bytes());
}

/// Reads a string written by [`write_string`]. `max_bytes` bounds the encoded
/// byte count; character limits are left to the caller.
pub fn read_string(reader: &mut impl Buf, max_bytes: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_bytes {
        return Err(Error::Invalid("String", "too long"));
    }
    let bytes = take(reader, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

pub fn string_encode_size(value: &str) -> usize {
    u32::SIZE + value.len()
}

pub fn write_uuid(id: &Uuid, writer: &mut impl BufMut) {
    writer.put_slice(id.as_bytes());
}

pub fn read_uuid(reader: &mut impl Buf) -> Result<Uuid, Error> {
    let bytes = take(reader, UUID_SIZE)?;
    Uuid::from_slice(&bytes).map_err(|_| Error::Invalid("Uuid", "wrong length"))
}

fn take(reader: &mut impl Buf, len: usize) -> Result<Bytes, Error> {
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    Ok(reader.copy_to_bytes(len))
}
