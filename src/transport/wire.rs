// SPDX-License-Identifier: GPL-3.0-only

//! Depth array framing for stream sockets
//!
//! ```text
//! ┌──────────────┬───────────────┬─────────────┬──────────────────────┐
//! │ frame_len u32│ header_len u32│ header JSON │ payload f32 LE × len │
//! └──────────────┴───────────────┴─────────────┴──────────────────────┘
//! ```
//!
//! All integers are little-endian. `frame_len` counts every byte after
//! itself.

use super::{DepthArray, MultiArrayLayout};
use crate::constants::MAX_WIRE_FRAME_BYTES;
use crate::errors::{TransportError, TransportResult};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

#[derive(Debug, Serialize, Deserialize)]
struct FrameHeader {
    topic: String,
    seq: u64,
    stamp_ns: i64,
    layout: MultiArrayLayout,
    len: u32,
}

/// Encode `msg` as one frame, appending to `out`
pub fn encode_frame(topic: &str, msg: &DepthArray, out: &mut Vec<u8>) -> TransportResult<()> {
    let header = FrameHeader {
        topic: topic.to_string(),
        seq: msg.seq,
        stamp_ns: msg.stamp.timestamp_nanos_opt().unwrap_or(0),
        layout: msg.layout.clone(),
        len: msg.data.len() as u32,
    };
    let header =
        serde_json::to_vec(&header).map_err(|e| TransportError::Encode(e.to_string()))?;

    let payload_len = msg.data.len() * std::mem::size_of::<f32>();
    let frame_len = 4 + header.len() + payload_len;
    if frame_len > MAX_WIRE_FRAME_BYTES {
        return Err(TransportError::Encode(format!(
            "frame of {} bytes exceeds the {} byte limit",
            frame_len, MAX_WIRE_FRAME_BYTES
        )));
    }

    out.reserve(4 + frame_len);
    out.extend_from_slice(&(frame_len as u32).to_le_bytes());
    out.extend_from_slice(&(header.len() as u32).to_le_bytes());
    out.extend_from_slice(&header);

    if cfg!(target_endian = "little") {
        out.extend_from_slice(bytemuck::cast_slice(&msg.data));
    } else {
        for value in &msg.data {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    Ok(())
}

/// Decode a frame body (everything after `frame_len`) into topic and message
pub fn decode_frame(body: &[u8]) -> TransportResult<(String, DepthArray)> {
    let header_len = body
        .get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
        .ok_or_else(|| TransportError::Decode("missing header length".into()))?;

    let header_bytes = body
        .get(4..4 + header_len)
        .ok_or_else(|| TransportError::Decode("truncated header".into()))?;
    let header: FrameHeader =
        serde_json::from_slice(header_bytes).map_err(|e| TransportError::Decode(e.to_string()))?;

    let payload = &body[4 + header_len..];
    if payload.len() != header.len as usize * 4 {
        return Err(TransportError::Decode(format!(
            "payload has {} bytes, header announces {} values",
            payload.len(),
            header.len
        )));
    }

    let data = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let msg = DepthArray {
        seq: header.seq,
        stamp: DateTime::from_timestamp_nanos(header.stamp_ns),
        layout: header.layout,
        data,
    };
    Ok((header.topic, msg))
}

/// Write one encoded frame to `writer`
pub fn write_frame<W: Write>(writer: &mut W, topic: &str, msg: &DepthArray) -> TransportResult<()> {
    let mut buf = Vec::new();
    encode_frame(topic, msg, &mut buf)?;
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Read and decode one frame from `reader`
pub fn read_frame<R: Read>(reader: &mut R) -> TransportResult<(String, DepthArray)> {
    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    let frame_len = u32::from_le_bytes(len) as usize;
    if frame_len > MAX_WIRE_FRAME_BYTES {
        return Err(TransportError::Decode(format!(
            "announced frame of {} bytes exceeds the {} byte limit",
            frame_len, MAX_WIRE_FRAME_BYTES
        )));
    }

    let mut body = vec![0u8; frame_len];
    reader.read_exact(&mut body)?;
    decode_frame(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::DepthGrid;
    use chrono::Utc;

    fn sample() -> DepthArray {
        let grid = DepthGrid::from_vec(
            3,
            2,
            vec![0.5, 1.25, f32::INFINITY, 2.0, f32::MAX, 15.0],
        )
        .unwrap();
        let mut msg = DepthArray::with_capacity(6);
        msg.fill_from_grid(&grid, 42, Utc::now());
        msg
    }

    #[test]
    fn test_frame_decodes_to_same_message() {
        let msg = sample();
        let mut buf = Vec::new();
        write_frame(&mut buf, "quad/depth", &msg).unwrap();

        let (topic, decoded) = read_frame(&mut buf.as_slice()).unwrap();
        assert_eq!(topic, "quad/depth");
        assert_eq!(decoded.seq, 42);
        assert_eq!(decoded.layout, msg.layout);
        assert_eq!(decoded.data, msg.data);
        assert_eq!(decoded.stamp, msg.stamp);
    }

    #[test]
    fn test_payload_is_little_endian_f32() {
        let msg = sample();
        let mut buf = Vec::new();
        encode_frame("t", &msg, &mut buf).unwrap();

        let tail = &buf[buf.len() - 4..];
        assert_eq!(tail, 15.0f32.to_le_bytes());
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let msg = sample();
        let mut buf = Vec::new();
        encode_frame("t", &msg, &mut buf).unwrap();

        let body = &buf[4..buf.len() - 2];
        assert!(matches!(decode_frame(body), Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let bytes = (u32::MAX).to_le_bytes();
        assert!(matches!(
            read_frame(&mut bytes.as_slice()),
            Err(TransportError::Decode(_))
        ));
    }
}
