//! Primitive codec: [VarInt](https://wiki.vg/Protocol#VarInt_and_VarLong),
//! VarInt-prefixed strings and frames.

use crate::SlpErr;
use std::io::{Read, Write};

const SEGMENT_BITS: u32 = 0x7F;
const CHECKER_BIT: u8 = 0x80;
const MAX_VARINT_LEN: usize = 5;

/// Encode the given number as a VarInt.
pub fn encode_varint(num: i32) -> Vec<u8> {
    // The protocol documentation mentions: "negative values always use the maximum number of bytes."
    // Shifting is done on the two's complement pattern, so it has to be unsigned.
    let mut num = num as u32;
    let mut result = Vec::<u8>::with_capacity(MAX_VARINT_LEN);

    loop {
        if (num & !SEGMENT_BITS) == 0 {
            result.push(num as u8);

            return result;
        }

        result.push(((num & SEGMENT_BITS) as u8) | CHECKER_BIT);
        num >>= 7;
    }
}

/// Decode a VarInt from the reader, one byte at a time.
pub fn decode_varint<R: Read>(reader: &mut R) -> Result<i32, SlpErr> {
    let mut result = 0u32;
    let mut buf = [0u8; 1];

    for i in 0..MAX_VARINT_LEN {
        reader.read_exact(&mut buf)?;
        result |= (buf[0] as u32 & SEGMENT_BITS) << (7 * i);

        if buf[0] & CHECKER_BIT == 0 {
            return Ok(result as i32);
        }
    }

    Err(SlpErr::VarIntTooLong)
}

/// UTF-8 string prefixed with its size in bytes as a VarInt.
pub fn encode_string(s: &str) -> Vec<u8> {
    let mut result = encode_varint(s.len() as i32);

    result.extend_from_slice(s.as_bytes());
    result
}

pub fn decode_string<R: Read>(reader: &mut R) -> Result<String, SlpErr> {
    let len = read_len(reader)?;

    Ok(String::from_utf8(read_exact_len(reader, len)?)?)
}

/// Write one frame: VarInt length of the packet followed by the packet.
///
/// Length and packet go out in a single write.
pub fn write_frame<W: Write>(writer: &mut W, packet: &[u8]) -> Result<(), SlpErr> {
    let mut frame = encode_varint(packet.len() as i32);

    frame.extend_from_slice(packet);
    writer.write_all(&frame)?;
    writer.flush()?;

    Ok(())
}

/// Read one frame and return the packet bytes it carries.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, SlpErr> {
    let len = read_len(reader)?;

    read_exact_len(reader, len)
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize, SlpErr> {
    let len = decode_varint(reader)?;

    usize::try_from(len).map_err(|_| SlpErr::ProtocolErr(format!("negative length: {}", len)))
}

/// Read exactly `len` bytes without trusting `len` for the allocation size.
fn read_exact_len<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, SlpErr> {
    let mut buffer = Vec::new();

    reader.take(len as u64).read_to_end(&mut buffer)?;

    if buffer.len() != len {
        return Err(SlpErr::TruncatedInput);
    }

    Ok(buffer)
}
