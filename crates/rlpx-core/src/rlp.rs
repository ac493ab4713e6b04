//! Small cursor helpers over `alloy_rlp::Header`.

use alloy_rlp::Header;

use crate::WireError;

/// Reads a list header and returns its payload, advancing `buf` past the list.
pub(crate) fn take_list<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], WireError> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(WireError::Unexpected("list"));
    }
    take_payload(buf, header.payload_length)
}

/// Reads a byte string that must be exactly `N` bytes long.
pub(crate) fn take_fixed<const N: usize>(
    buf: &mut &[u8],
    field: &'static str,
) -> Result<[u8; N], WireError> {
    let header = Header::decode(buf)?;
    if header.list {
        return Err(WireError::Unexpected("string"));
    }
    let bytes = take_payload(buf, header.payload_length)?;
    fixed(bytes, field)
}

/// Returns one complete RLP item (header included) without interpreting it.
pub(crate) fn take_raw_item<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], WireError> {
    let start = *buf;
    let header = Header::decode(buf)?;
    let header_len = start.len() - buf.len();
    take_payload(buf, header.payload_length)?;
    Ok(&start[..header_len + header.payload_length])
}

/// Copies a slice into an array, checking the length first.
pub(crate) fn fixed<const N: usize>(
    bytes: &[u8],
    field: &'static str,
) -> Result<[u8; N], WireError> {
    bytes.try_into().map_err(|_| WireError::Length {
        field,
        expected: N,
        got: bytes.len(),
    })
}

fn take_payload<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], WireError> {
    if buf.len() < len {
        return Err(WireError::TooShort(buf.len()));
    }
    let (payload, rest) = buf.split_at(len);
    *buf = rest;
    Ok(payload)
}
