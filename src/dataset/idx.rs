//! IDX file parsing
//!
//! MNIST ships as IDX files: a big-endian header (magic number, item count,
//! and for images the row/column sizes) followed by raw `u8` payload.

use crate::utils::error::{MnistError, Result};

/// Magic number of an IDX file holding `u8` images (3 dimensions)
pub const IMAGES_MAGIC: u32 = 0x0000_0803;

/// Magic number of an IDX file holding `u8` labels (1 dimension)
pub const LABELS_MAGIC: u32 = 0x0000_0801;

/// Decoded image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxImages {
    pub count: usize,
    pub rows: usize,
    pub cols: usize,
    /// `count * rows * cols` pixels, row-major per image
    pub pixels: Vec<u8>,
}

impl IdxImages {
    /// Pixels of the image at `index`
    pub fn image(&self, index: usize) -> Option<&[u8]> {
        let size = self.rows * self.cols;
        let start = index.checked_mul(size)?;
        self.pixels.get(start..start + size)
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| MnistError::Dataset(format!("IDX header truncated at byte {offset}")))
}

fn check_magic(bytes: &[u8], expected: u32) -> Result<()> {
    let magic = read_u32(bytes, 0)?;
    if magic != expected {
        return Err(MnistError::Dataset(format!(
            "unexpected IDX magic number {magic:#010x}, expected {expected:#010x}"
        )));
    }
    Ok(())
}

/// Parse an IDX image file
pub fn parse_images(bytes: &[u8]) -> Result<IdxImages> {
    check_magic(bytes, IMAGES_MAGIC)?;

    let count = read_u32(bytes, 4)? as usize;
    let rows = read_u32(bytes, 8)? as usize;
    let cols = read_u32(bytes, 12)? as usize;

    let payload = &bytes[16..];
    let expected = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| MnistError::Dataset(format!("IDX header sizes {count} x {rows} x {cols} overflow")))?;
    if payload.len() != expected {
        return Err(MnistError::Dataset(format!(
            "IDX image payload has {} bytes, header declares {count} x {rows} x {cols} = {expected}",
            payload.len()
        )));
    }

    Ok(IdxImages {
        count,
        rows,
        cols,
        pixels: payload.to_vec(),
    })
}

/// Parse an IDX label file
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    check_magic(bytes, LABELS_MAGIC)?;

    let count = read_u32(bytes, 4)? as usize;
    let payload = &bytes[8..];
    if payload.len() != count {
        return Err(MnistError::Dataset(format!(
            "IDX label payload has {} bytes, header declares {count}",
            payload.len()
        )));
    }

    Ok(payload.to_vec())
}

#[cfg(test)]
pub(crate) fn encode_images(images: &[Vec<u8>], rows: usize, cols: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&(images.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&(rows as u32).to_be_bytes());
    bytes.extend_from_slice(&(cols as u32).to_be_bytes());
    for image in images {
        bytes.extend_from_slice(image);
    }
    bytes
}

#[cfg(test)]
pub(crate) fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    bytes.extend_from_slice(labels);
    bytes
}
