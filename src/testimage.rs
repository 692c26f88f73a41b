//! Synthetic disk image for trying the carver without real evidence.

use crate::error::{CarveError, Result};
use std::fs;
use std::path::Path;

const PAYLOAD_REPEAT: usize = 100;

/// Magic bytes and the filler tag repeated after them
static PAYLOADS: [(&[u8], &[u8; 4]); 6] = [
    (&[0xFF, 0xD8, 0xFF, 0xE0], b"JPEG"),
    (&[0x89, 0x50, 0x4E, 0x47], b"PNG_"),
    (&[0x25, 0x50, 0x44, 0x46], b"PDF_"),
    (&[0x50, 0x4B, 0x03, 0x04], b"ZIP_"),
    (&[0x49, 0x44, 0x33], b"MP3_"),
    (&[0x52, 0x61, 0x72, 0x21], b"RAR_"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlantedSignature {
    pub pattern: &'static [u8],
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct TestImage {
    pub data: Vec<u8>,
    pub planted: Vec<PlantedSignature>,
}

/// Builds the image in memory.
///
/// Gaps between payloads hold a byte ramp with stride 97, which contains
/// none of the built-in signatures. A zero byte fences each payload so no
/// pattern can straddle filler and payload.
pub fn build_test_image() -> TestImage {
    let mut data = Vec::new();
    let mut planted = Vec::with_capacity(PAYLOADS.len());

    for (i, (magic, tag)) in PAYLOADS.iter().enumerate() {
        push_filler(&mut data, 100 + 173 * i);
        data.push(0);

        planted.push(PlantedSignature {
            pattern: *magic,
            offset: data.len() as u64,
        });
        data.extend_from_slice(magic);
        for _ in 0..PAYLOAD_REPEAT {
            data.extend_from_slice(*tag);
        }

        data.push(0);
        push_filler(&mut data, 500 + 297 * i);
    }

    TestImage { data, planted }
}

pub fn write_test_image(path: &Path) -> Result<TestImage> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CarveError::write(parent, e))?;
    }
    let image = build_test_image();
    fs::write(path, &image.data).map_err(|e| CarveError::write(path, e))?;
    tracing::info!(path = %path.display(), size = image.data.len(), "Test image written");
    Ok(image)
}

fn push_filler(data: &mut Vec<u8>, len: usize) {
    let start = data.len();
    data.extend((start..start + len).map(|i| (i.wrapping_mul(97).wrapping_add(13) % 256) as u8));
}
