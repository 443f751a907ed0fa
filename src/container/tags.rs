use std::collections::BTreeMap;

use tracing::debug;

/// Reads tag text out of EXIF blocks and C2PA manifests.
///
/// The chunk reader hands raw segment bytes over this seam instead of parsing
/// EXIF/JUMBF itself, so callers with a full tag library can plug it in.
pub trait TagReader: Send + Sync {
    /// Tag name -> text for the tags worth keeping. `exif` starts at the TIFF header.
    fn read_exif(
        &self,
        exif: &[u8],
    ) -> BTreeMap<String, String>;

    /// A textual rendering of a C2PA manifest store, if one can be produced.
    fn read_c2pa(
        &self,
        manifest: &[u8],
    ) -> Option<String>;
}

/// Minimal built-in reader: IFD0 plus the Exif sub-IFD, and printable text of C2PA boxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicTagReader;

const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_ARTIST: u16 = 0x013B;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286;
const TAG_XP_COMMENT: u16 = 0x9C9C;

const MIN_TEXT_RUN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

struct Tiff<'a> {
    data: &'a [u8],
    order: ByteOrder,
}

impl<'a> Tiff<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        let order = match data.get(..2)? {
            b"II" => ByteOrder::Little,
            b"MM" => ByteOrder::Big,
            _ => return None,
        };
        let tiff = Self {
            data,
            order,
        };
        (tiff.u16_at(2)? == 42).then_some(tiff)
    }

    fn u16_at(
        &self,
        offset: usize,
    ) -> Option<u16> {
        let b = self.data.get(offset..offset.checked_add(2)?)?;
        Some(match self.order {
            ByteOrder::Little => u16::from_le_bytes([b[0], b[1]]),
            ByteOrder::Big => u16::from_be_bytes([b[0], b[1]]),
        })
    }

    fn u32_at(
        &self,
        offset: usize,
    ) -> Option<u32> {
        let b = self.data.get(offset..offset.checked_add(4)?)?;
        Some(match self.order {
            ByteOrder::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            ByteOrder::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        })
    }

    /// Raw value bytes of the 12-byte IFD entry at `entry`.
    fn value_bytes(
        &self,
        entry: usize,
    ) -> Option<&'a [u8]> {
        let kind = self.u16_at(entry + 2)?;
        let count = self.u32_at(entry + 4)? as usize;
        let unit = match kind {
            1 | 2 | 6 | 7 => 1,
            3 | 8 => 2,
            4 | 9 => 4,
            _ => return None,
        };
        let size = count.checked_mul(unit)?;
        let start = if size <= 4 { entry + 8 } else { self.u32_at(entry + 8)? as usize };
        self.data.get(start..start.checked_add(size)?)
    }

    /// Collect the text tags of the IFD at `offset`. Returns the Exif
    /// sub-IFD pointer it holds, which the caller follows at most once.
    fn walk_ifd(
        &self,
        offset: usize,
        out: &mut BTreeMap<String, String>,
    ) -> Option<usize> {
        let count = self.u16_at(offset)?;
        let mut exif_ifd = None;

        for i in 0..count as usize {
            let entry = offset + 2 + i * 12;
            let Some(tag) = self.u16_at(entry) else {
                break;
            };

            match tag {
                TAG_EXIF_IFD => {
                    exif_ifd = exif_ifd.or(self.u32_at(entry + 8).map(|sub| sub as usize));
                }
                TAG_IMAGE_DESCRIPTION | TAG_SOFTWARE | TAG_ARTIST => {
                    let name = match tag {
                        TAG_IMAGE_DESCRIPTION => "ImageDescription",
                        TAG_SOFTWARE => "Software",
                        _ => "Artist",
                    };
                    if let Some(text) = self.value_bytes(entry).map(ascii_text) {
                        put(out, name, text);
                    }
                }
                TAG_USER_COMMENT => {
                    if let Some(text) = self.value_bytes(entry).and_then(|b| user_comment(b, self.order)) {
                        put(out, "UserComment", text);
                    }
                }
                TAG_XP_COMMENT => {
                    if let Some(text) = self.value_bytes(entry).map(|b| utf16(b, ByteOrder::Little)) {
                        put(out, "Comment", text);
                    }
                }
                _ => {}
            }
        }

        exif_ifd
    }
}

fn put(
    out: &mut BTreeMap<String, String>,
    name: &str,
    text: String,
) {
    let text = text.trim_end_matches('\0').trim().to_string();
    if !text.is_empty() {
        out.entry(name.to_string()).or_insert(text);
    }
}

fn ascii_text(bytes: &[u8]) -> String {
    super::decode_text(bytes.split(|&b| b == 0).next().unwrap_or_default())
}

fn utf16(
    bytes: &[u8],
    order: ByteOrder,
) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| match order {
            ByteOrder::Little => u16::from_le_bytes([pair[0], pair[1]]),
            ByteOrder::Big => u16::from_be_bytes([pair[0], pair[1]]),
        })
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// UserComment carries an 8-byte charset prefix before the text.
fn user_comment(
    bytes: &[u8],
    tiff_order: ByteOrder,
) -> Option<String> {
    if bytes.len() < 8 {
        return None;
    }
    let (prefix, body) = bytes.split_at(8);

    if prefix.starts_with(b"UNICODE") {
        let (order, body) = match body {
            [0xFE, 0xFF, rest @ ..] => (ByteOrder::Big, rest),
            [0xFF, 0xFE, rest @ ..] => (ByteOrder::Little, rest),
            _ => (sniff_utf16_order(body).unwrap_or(tiff_order), body),
        };
        return Some(utf16(body, order));
    }

    // ASCII, JIS and undefined prefixes: writers put UTF-8 there in practice
    Some(String::from_utf8_lossy(body).into_owned())
}

/// Latin text in UTF-16 has a zero high byte; its position gives the byte order.
fn sniff_utf16_order(body: &[u8]) -> Option<ByteOrder> {
    let (mut even, mut odd) = (0usize, 0usize);
    for pair in body.chunks_exact(2).take(64) {
        even += (pair[0] == 0) as usize;
        odd += (pair[1] == 0) as usize;
    }
    match even.cmp(&odd) {
        std::cmp::Ordering::Greater => Some(ByteOrder::Big),
        std::cmp::Ordering::Less => Some(ByteOrder::Little),
        std::cmp::Ordering::Equal => None,
    }
}

impl TagReader for BasicTagReader {
    fn read_exif(
        &self,
        exif: &[u8],
    ) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let Some(tiff) = Tiff::new(exif) else {
            debug!("exif block without a tiff header");
            return out;
        };
        let Some(ifd0) = tiff.u32_at(4).map(|o| o as usize) else {
            return out;
        };
        // IFD0 and its Exif sub-IFD only; pointers inside the sub-IFD are not followed
        match tiff.walk_ifd(ifd0, &mut out) {
            Some(sub) if sub != ifd0 => {
                tiff.walk_ifd(sub, &mut out);
            }
            Some(_) => debug!("exif sub-ifd points back at ifd0"),
            None => {}
        }
        out
    }

    fn read_c2pa(
        &self,
        manifest: &[u8],
    ) -> Option<String> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for &b in manifest.iter().chain(std::iter::once(&0)) {
            if (0x20..=0x7E).contains(&b) {
                current.push(b);
            } else {
                if current.len() >= MIN_TEXT_RUN {
                    runs.push(String::from_utf8_lossy(&current).into_owned());
                }
                current.clear();
            }
        }
        (!runs.is_empty()).then(|| runs.join("\n"))
    }
}
