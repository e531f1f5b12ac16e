//! MNIST file loading and download
//!
//! Files live under `<data_dir>/MNIST/raw/`, the same layout torchvision
//! uses, so an existing cache can be shared. Each file may be stored
//! uncompressed or gzipped; downloads keep the `.gz` form.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use super::idx::{self, IdxImages};
use crate::utils::error::{MnistError, Result};

/// CVDF mirror of the original MNIST distribution
pub const MIRROR_URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";

/// Dataset split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnistSplit {
    Train,
    Test,
}

impl MnistSplit {
    pub fn images_file(&self) -> &'static str {
        match self {
            MnistSplit::Train => "train-images-idx3-ubyte",
            MnistSplit::Test => "t10k-images-idx3-ubyte",
        }
    }

    pub fn labels_file(&self) -> &'static str {
        match self {
            MnistSplit::Train => "train-labels-idx1-ubyte",
            MnistSplit::Test => "t10k-labels-idx1-ubyte",
        }
    }
}

impl std::fmt::Display for MnistSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MnistSplit::Train => write!(f, "train"),
            MnistSplit::Test => write!(f, "test"),
        }
    }
}

/// Raw images and labels of one split, as read from disk
#[derive(Debug, Clone)]
pub struct RawSplit {
    pub images: IdxImages,
    pub labels: Vec<u8>,
}

/// Directory holding the IDX files for `data_dir`
pub fn raw_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("MNIST").join("raw")
}

/// Read both files of a split, downloading them first when allowed
pub fn load_split(data_dir: &Path, split: MnistSplit, download: bool) -> Result<RawSplit> {
    let dir = raw_dir(data_dir);

    let images = idx::parse_images(&read_idx_file(&dir, split.images_file(), download)?)?;
    let labels = idx::parse_labels(&read_idx_file(&dir, split.labels_file(), download)?)?;

    if images.count != labels.len() {
        return Err(MnistError::Dataset(format!(
            "{split} split has {} images but {} labels",
            images.count,
            labels.len()
        )));
    }

    info!("Loaded {} {} images ({}x{})", images.count, split, images.rows, images.cols);
    Ok(RawSplit { images, labels })
}

/// Make sure every file of both splits is present on disk
pub fn download_all(data_dir: &Path) -> Result<()> {
    let dir = raw_dir(data_dir);
    for split in [MnistSplit::Train, MnistSplit::Test] {
        for name in [split.images_file(), split.labels_file()] {
            if locate(&dir, name).is_none() {
                download_file(&dir, name)?;
            }
        }
    }
    Ok(())
}

fn locate(dir: &Path, name: &str) -> Option<PathBuf> {
    let raw = dir.join(name);
    if raw.exists() {
        return Some(raw);
    }
    let gz = dir.join(format!("{name}.gz"));
    gz.exists().then_some(gz)
}

fn read_idx_file(dir: &Path, name: &str, download: bool) -> Result<Vec<u8>> {
    let path = match locate(dir, name) {
        Some(path) => path,
        None if download => download_file(dir, name)?,
        None => {
            return Err(MnistError::Dataset(format!(
                "{} not found in {} and downloading is disabled",
                name,
                dir.display()
            )))
        }
    };

    debug!("Reading {:?}", path);
    let mut bytes = Vec::new();
    let mut file = File::open(&path)?;

    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        GzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        file.read_to_end(&mut bytes)?;
    }

    Ok(bytes)
}

fn download_file(dir: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let file_name = format!("{name}.gz");
    let url = format!("{MIRROR_URL}{file_name}");
    let target = dir.join(&file_name);

    info!("Downloading {}", url);

    let response = reqwest::blocking::get(&url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| MnistError::Download(url.clone(), e.to_string()))?;
    let bytes = response
        .bytes()
        .map_err(|e| MnistError::Download(url.clone(), e.to_string()))?;

    // Only complete files may carry the final name.
    let partial = dir.join(format!("{file_name}.part"));
    let mut file = File::create(&partial)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    fs::rename(&partial, &target)?;

    info!("Saved {} bytes to {:?}", bytes.len(), target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn write_split(data_dir: &Path, split: MnistSplit, gzip: bool) {
        let dir = raw_dir(data_dir);
        fs::create_dir_all(&dir).unwrap();

        let images = idx::encode_images(&[vec![0u8; 4], vec![255u8; 4]], 2, 2);
        let labels = idx::encode_labels(&[3, 9]);

        for (name, bytes) in [(split.images_file(), images), (split.labels_file(), labels)] {
            if gzip {
                let file = File::create(dir.join(format!("{name}.gz"))).unwrap();
                let mut encoder = GzEncoder::new(file, Compression::default());
                encoder.write_all(&bytes).unwrap();
                encoder.finish().unwrap();
            } else {
                fs::write(dir.join(name), bytes).unwrap();
            }
        }
    }

    #[test]
    fn test_load_uncompressed_split() {
        let tmp = TempDir::new().unwrap();
        write_split(tmp.path(), MnistSplit::Test, false);

        let split = load_split(tmp.path(), MnistSplit::Test, false).unwrap();
        assert_eq!(split.images.count, 2);
        assert_eq!(split.labels, vec![3, 9]);
    }

    #[test]
    fn test_load_gzipped_split() {
        let tmp = TempDir::new().unwrap();
        write_split(tmp.path(), MnistSplit::Train, true);

        let split = load_split(tmp.path(), MnistSplit::Train, false).unwrap();
        assert_eq!(split.images.image(1), Some(&[255u8; 4][..]));
    }

    #[test]
    fn test_missing_files_without_download() {
        let tmp = TempDir::new().unwrap();
        let result = load_split(tmp.path(), MnistSplit::Train, false);
        assert!(matches!(result, Err(MnistError::Dataset(_))));
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_split(tmp.path(), MnistSplit::Test, false);
        let dir = raw_dir(tmp.path());
        fs::write(dir.join(MnistSplit::Test.labels_file()), idx::encode_labels(&[1])).unwrap();

        assert!(load_split(tmp.path(), MnistSplit::Test, false).is_err());
    }
}
