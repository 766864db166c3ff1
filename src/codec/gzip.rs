//! Gzip container framing (RFC 1952) around raw deflate.
//!
//! The header and trailer are assembled and parsed by hand; only the deflate
//! payload goes through `flate2`. Decompression first tries a single-shot
//! decode into a buffer sized from the trailer, then falls back to a paged
//! streaming decode when that buffer turns out to be wrong (the trailer size
//! is only the original length modulo 2^32). The trailer size is a sizing
//! hint; the CRC is what guards the content.

use crate::codec::crc32;
use crate::error::CodecError;
use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;
use tracing::debug;

const MAGIC: [u8; 2] = [0x1F, 0x8B];
const METHOD_DEFLATE: u8 = 8;
const HEADER_LEN: usize = 10;
const TRAILER_LEN: usize = 8;

const FLAG_HCRC: u8 = 0x02;
const FLAG_EXTRA: u8 = 0x04;
const FLAG_NAME: u8 = 0x08;
const FLAG_COMMENT: u8 = 0x10;
const FLAG_RESERVED: u8 = 0xE0;

/// OS byte written into produced headers ("unknown")
const OS_UNKNOWN: u8 = 0xFF;

/// Modulus applied to the ISIZE trailer field. Inputs of 4 GiB or more wrap.
pub const SIZE_MODULUS: u64 = 1 << 32;

/// Extra capacity added to the declared size for the single-shot decode
const SINGLE_SHOT_SLACK: usize = 1024;

/// Growth step of the streaming fallback
const STREAM_PAGE_SIZE: usize = 256 * 1024;

/// Decompress a complete gzip container into its original bytes.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let payload_start = parse_header(data)?;
    if data.len() < payload_start + TRAILER_LEN {
        return Err(CodecError::Truncated);
    }
    let trailer_start = data.len() - TRAILER_LEN;
    let payload = &data[payload_start..trailer_start];
    let expected_crc = read_u32_le(&data[trailer_start..trailer_start + 4]);
    let declared_size = read_u32_le(&data[trailer_start + 4..]) as usize;

    let output = match inflate_single_shot(payload, declared_size) {
        Some(output) => output,
        None => {
            debug!(declared_size, "Single-shot inflate failed, falling back to streaming");
            inflate_streaming(payload)?
        }
    };

    let actual_crc = crc32::checksum(&output);
    if actual_crc != expected_crc {
        return Err(CodecError::DecodeFailed(format!(
            "CRC mismatch: trailer {:08x}, payload {:08x}",
            expected_crc, actual_crc
        )));
    }
    if (output.len() as u64 % SIZE_MODULUS) as usize != declared_size {
        debug!(
            declared_size,
            actual_size = output.len(),
            "Trailer size disagrees with payload"
        );
    }

    Ok(output)
}

/// Compress bytes into a gzip container.
///
/// Empty input is rejected: an empty Live set is a caller error.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if data.is_empty() {
        return Err(CodecError::EmptyInput);
    }

    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(data.len() / 4 + HEADER_LEN + TRAILER_LEN),
        Compression::default(),
    );
    encoder
        .write_all(data)
        .map_err(|e| CodecError::EncodeFailed(e.to_string()))?;
    let deflated = encoder
        .finish()
        .map_err(|e| CodecError::EncodeFailed(e.to_string()))?;

    let mut output = Vec::with_capacity(HEADER_LEN + deflated.len() + TRAILER_LEN);
    output.extend_from_slice(&MAGIC);
    output.push(METHOD_DEFLATE);
    output.push(0); // flags
    output.extend_from_slice(&[0, 0, 0, 0]); // mtime
    output.push(0); // extra flags
    output.push(OS_UNKNOWN);
    output.extend_from_slice(&deflated);
    output.extend_from_slice(&crc32::checksum(data).to_le_bytes());
    output.extend_from_slice(&((data.len() as u64 % SIZE_MODULUS) as u32).to_le_bytes());

    Ok(output)
}

/// Returns true when the bytes start with the gzip magic number.
pub fn has_magic(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == MAGIC
}

/// Validate the header and return the offset of the deflate payload.
fn parse_header(data: &[u8]) -> Result<usize, CodecError> {
    if data.len() < MAGIC.len() {
        return Err(CodecError::Truncated);
    }
    if !has_magic(data) {
        return Err(CodecError::InvalidHeader(format!(
            "bad magic {:02x}{:02x}",
            data[0], data[1]
        )));
    }
    if data.len() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if data[2] != METHOD_DEFLATE {
        return Err(CodecError::InvalidHeader(format!(
            "unsupported compression method {}",
            data[2]
        )));
    }
    let flags = data[3];
    if flags & FLAG_RESERVED != 0 {
        return Err(CodecError::InvalidHeader(format!(
            "reserved flag bits set ({:02x})",
            flags
        )));
    }

    let mut pos = HEADER_LEN;
    if flags & FLAG_EXTRA != 0 {
        let length_bytes = data.get(pos..pos + 2).ok_or(CodecError::Truncated)?;
        let extra_len = u16::from_le_bytes([length_bytes[0], length_bytes[1]]) as usize;
        pos += 2 + extra_len;
    }
    if flags & FLAG_NAME != 0 {
        pos = skip_zero_terminated(data, pos)?;
    }
    if flags & FLAG_COMMENT != 0 {
        pos = skip_zero_terminated(data, pos)?;
    }
    if flags & FLAG_HCRC != 0 {
        pos += 2;
    }
    if pos > data.len() {
        return Err(CodecError::Truncated);
    }

    Ok(pos)
}

fn skip_zero_terminated(data: &[u8], start: usize) -> Result<usize, CodecError> {
    let rest = data.get(start..).ok_or(CodecError::Truncated)?;
    let terminator = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(CodecError::Truncated)?;
    Ok(start + terminator + 1)
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode into one buffer sized from the trailer. `None` means "try streaming".
fn inflate_single_shot(payload: &[u8], declared_size: usize) -> Option<Vec<u8>> {
    let mut inflater = Decompress::new(false);
    let mut output = Vec::with_capacity(declared_size.saturating_add(SINGLE_SHOT_SLACK));
    match inflater.decompress_vec(payload, &mut output, FlushDecompress::Finish) {
        Ok(Status::StreamEnd) => Some(output),
        _ => None,
    }
}

fn inflate_streaming(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut inflater = Decompress::new(false);
    let mut output: Vec<u8> = Vec::with_capacity(STREAM_PAGE_SIZE);

    loop {
        if output.capacity() - output.len() < STREAM_PAGE_SIZE {
            output.reserve(STREAM_PAGE_SIZE);
        }
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        let status = inflater
            .decompress_vec(&payload[consumed..], &mut output, FlushDecompress::None)
            .map_err(|e| CodecError::DecodeFailed(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(output),
            Status::Ok | Status::BufError => {
                let stalled = inflater.total_in() as usize == consumed
                    && inflater.total_out() == produced;
                if stalled && inflater.total_in() as usize >= payload.len() {
                    return Err(CodecError::Truncated);
                }
                if stalled && output.capacity() > output.len() {
                    return Err(CodecError::DecodeFailed(
                        "inflater made no progress".to_string(),
                    ));
                }
            }
        }
    }
}
