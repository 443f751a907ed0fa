#![allow(dead_code)]

use std::io::Write;

use base64::{Engine, engine::general_purpose};
use flate2::{Compression, Crc, write::ZlibEncoder};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub fn chunk(
    kind: &[u8; 4],
    data: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 12);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.sum().to_be_bytes());
    out
}

pub fn text(
    keyword: &str,
    text: &str,
) -> Vec<u8> {
    let mut data = keyword.as_bytes().to_vec();
    data.push(0);
    data.extend_from_slice(text.as_bytes());
    chunk(b"tEXt", &data)
}

/// Compressed `iTXt` with empty language and translated keyword.
pub fn itxt_compressed(
    keyword: &str,
    text: &str,
) -> Vec<u8> {
    let mut data = keyword.as_bytes().to_vec();
    data.extend_from_slice(&[0, 1, 0, 0, 0]);
    data.extend(zlib(text.as_bytes()));
    chunk(b"iTXt", &data)
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// base64(zlib(text)), the layered form some exporters embed.
pub fn base64_zlib(text: &str) -> String {
    general_purpose::STANDARD.encode(zlib(text.as_bytes()))
}

pub fn png(
    width: u32,
    height: u32,
    chunks: &[Vec<u8>],
) -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
    out.extend(chunk(b"IHDR", &ihdr));
    for c in chunks {
        out.extend_from_slice(c);
    }
    out.extend(chunk(b"IEND", &[]));
    out
}

pub fn segment(
    marker: u8,
    data: &[u8],
) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((data.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// SOI, the given segments, SOF0, SOS, EOI.
pub fn jpeg(
    width: u16,
    height: u16,
    segments: &[Vec<u8>],
) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    for s in segments {
        out.extend_from_slice(s);
    }
    let mut sof = vec![8];
    sof.extend_from_slice(&height.to_be_bytes());
    sof.extend_from_slice(&width.to_be_bytes());
    sof.extend_from_slice(&[1, 1, 0x11, 0]);
    out.extend(segment(0xC0, &sof));
    out.extend(segment(0xDA, &[1, 1, 0, 0, 63, 0]));
    out.extend_from_slice(&[0x00, 0xFF, 0xD9]);
    out
}

/// Little-endian TIFF block whose IFDs each point at the next through the
/// Exif sub-IFD tag. Only the last one holds a Software entry.
pub fn chained_exif(count: usize) -> Vec<u8> {
    const IFD_LEN: usize = 2 + 12 + 4;
    let mut block = b"II\x2A\x00\x08\x00\x00\x00".to_vec();
    for i in 0..count {
        block.extend_from_slice(&1u16.to_le_bytes());
        if i + 1 < count {
            let next = 8 + (i + 1) * IFD_LEN;
            block.extend_from_slice(&0x8769u16.to_le_bytes());
            block.extend_from_slice(&4u16.to_le_bytes());
            block.extend_from_slice(&1u32.to_le_bytes());
            block.extend_from_slice(&(next as u32).to_le_bytes());
        } else {
            block.extend_from_slice(&0x0131u16.to_le_bytes());
            block.extend_from_slice(&2u16.to_le_bytes());
            block.extend_from_slice(&4u32.to_le_bytes());
            block.extend_from_slice(b"abc\0");
        }
        block.extend_from_slice(&0u32.to_le_bytes());
    }
    block
}

/// API-format workflow whose latent reaches the sampler through `len`
/// nodes of `class_type`, each linked to the one before.
pub fn latent_chain_workflow(
    class_type: &str,
    len: usize,
) -> serde_json::Value {
    let mut nodes = serde_json::Map::new();
    nodes.insert("0".into(), serde_json::json!({"class_type": "EmptyLatentImage", "inputs": {"width": 512, "height": 512}}));
    for i in 1..=len {
        nodes.insert(i.to_string(), serde_json::json!({"class_type": class_type, "inputs": {"x": [(i - 1).to_string(), 0]}}));
    }
    nodes.insert("p".into(), serde_json::json!({"class_type": "CLIPTextEncode", "inputs": {"text": "a harbour at dawn"}}));
    nodes.insert(
        "k".into(),
        serde_json::json!({"class_type": "KSampler", "inputs": {"steps": 20, "positive": ["p", 0], "latent_image": [len.to_string(), 0]}}),
    );
    nodes.insert("s".into(), serde_json::json!({"class_type": "SaveImage", "inputs": {"images": ["k", 0]}}));
    serde_json::Value::Object(nodes)
}
