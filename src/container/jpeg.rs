//! JPEG segment walking.
//!
//! Only the marker segments ahead of the first scan are read: APP1 (Exif and
//! XMP), APP11 (JUMBF boxes carrying a C2PA manifest), COM and the SOF frame
//! header.

use tracing::debug;

use crate::{
    Config,
    container::{C2PA_KEYWORD, ContainerText, TagReader, XMP_KEYWORD, decode_text, insert_chunk},
};

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP1: u8 = 0xE1;
const APP11: u8 = 0xEB;
const COM: u8 = 0xFE;

/// A marker segment with its payload (length field excluded).
#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    marker: u8,
    data: &'a [u8],
}

fn is_standalone(marker: u8) -> bool {
    matches!(marker, 0x01 | SOI | 0xD0..=0xD7)
}

fn is_frame_header(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

/// Walk the marker segments from SOI up to SOS or EOI.
fn segments(bytes: &[u8]) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut pos = 2;

    while pos < bytes.len() {
        if bytes[pos] != 0xFF {
            debug!("jpeg marker expected at offset {}, stopping", pos);
            break;
        }
        // fill bytes
        while pos < bytes.len() && bytes[pos] == 0xFF {
            pos += 1;
        }
        let Some(&marker) = bytes.get(pos) else {
            break;
        };
        pos += 1;

        if is_standalone(marker) {
            continue;
        }
        if marker == EOI || marker == SOS {
            break;
        }

        let Some(len_bytes) = bytes.get(pos..pos + 2) else {
            debug!("jpeg stream truncated inside the length of marker {:02X}", marker);
            break;
        };
        let length = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        if length < 2 || pos + length > bytes.len() {
            debug!("jpeg segment {:02X} declares {} bytes past the end of the buffer", marker, length);
            break;
        }

        out.push(Segment {
            marker,
            data: &bytes[pos + 2..pos + length],
        });
        pos += length;
    }

    out
}

pub(super) fn read_jpeg(
    bytes: &[u8],
    config: &Config,
    tags: &dyn TagReader,
    out: &mut ContainerText,
) {
    let mut jumbf = Vec::new();

    for segment in segments(bytes) {
        match segment.marker {
            APP1 if segment.data.starts_with(EXIF_HEADER) => {
                for (tag, value) in tags.read_exif(&segment.data[EXIF_HEADER.len()..]) {
                    insert_chunk(&mut out.chunks, config, &tag, value);
                }
            }
            APP1 if segment.data.starts_with(XMP_HEADER) => {
                let packet = String::from_utf8_lossy(&segment.data[XMP_HEADER.len()..]).into_owned();
                insert_chunk(&mut out.chunks, config, XMP_KEYWORD, packet);
            }
            // JPEG XT box: "JP", box instance (2), packet sequence (4), then the JUMBF box
            APP11 if segment.data.len() > 8 && segment.data.starts_with(b"JP") => {
                jumbf.extend_from_slice(&segment.data[8..]);
            }
            COM => {
                insert_chunk(&mut out.chunks, config, "Comment", decode_text(segment.data));
            }
            marker if is_frame_header(marker) && segment.data.len() >= 5 => {
                let height = u16::from_be_bytes([segment.data[1], segment.data[2]]) as u32;
                let width = u16::from_be_bytes([segment.data[3], segment.data[4]]) as u32;
                if width > 0 && height > 0 && out.dimensions.is_none() {
                    out.dimensions = Some((width, height));
                }
            }
            _ => {}
        }
    }

    if !jumbf.is_empty() {
        if let Some(text) = tags.read_c2pa(&jumbf) {
            insert_chunk(&mut out.chunks, config, C2PA_KEYWORD, text);
        }
    }
}
