//! Model checkpointing
//!
//! Weights are stored as a full-precision named MessagePack record. The
//! recorder forces the `.mpk` extension, so every path handled here is
//! normalized through [`checkpoint_path`].

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use tracing::info;

use crate::model::{ConvNet, ConvNetConfig};
use crate::utils::error::{MnistError, Result};

/// Recorder used for every model file
pub type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// How the model of a run was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOrigin {
    /// Weights restored from this file
    Restored(PathBuf),
    /// Freshly initialised weights
    Fresh,
}

/// Path the recorder actually reads and writes for `path`.
///
/// `.mpk` is appended unless already present, so `run.v1` maps to
/// `run.v1.mpk` and never collides with `run.v2`.
pub fn checkpoint_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "mpk") {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".mpk");
    PathBuf::from(name)
}

/// Persist the model weights, replacing any previous checkpoint
pub fn save_model<B: Backend>(model: &ConvNet<B>, path: &Path) -> Result<PathBuf> {
    let path = checkpoint_path(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    model
        .clone()
        .save_file(path.clone(), &ModelRecorder::new())
        .map_err(|e| MnistError::Model(format!("Failed to save {}: {e:?}", path.display())))?;

    info!("Model saved to {:?}", path);
    Ok(path)
}

/// Load weights from `path` into a model built from `config`
pub fn load_model<B: Backend>(
    config: &ConvNetConfig,
    path: &Path,
    device: &B::Device,
) -> Result<ConvNet<B>> {
    let path = checkpoint_path(path);
    if !path.exists() {
        return Err(MnistError::Model(format!("checkpoint {} not found", path.display())));
    }

    config
        .init::<B>(device)
        .load_file(path.clone(), &ModelRecorder::new(), device)
        .map_err(|e| MnistError::Model(format!("Failed to load {}: {e:?}", path.display())))
}

/// Restore the model from `path` when a checkpoint exists, otherwise initialise it
pub fn load_or_init<B: Backend>(
    config: &ConvNetConfig,
    path: &Path,
    device: &B::Device,
) -> Result<(ConvNet<B>, ModelOrigin)> {
    let resolved = checkpoint_path(path);
    if resolved.exists() {
        let model = load_model(config, &resolved, device)?;
        info!("Resuming from checkpoint {:?}", resolved);
        Ok((model, ModelOrigin::Restored(resolved)))
    } else {
        info!("No checkpoint at {:?}, starting from fresh weights", resolved);
        Ok((config.init(device), ModelOrigin::Fresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, Tensor};
    use tempfile::TempDir;

    type TestBackend = NdArray;

    #[test]
    fn test_checkpoint_path_appends_extension() {
        assert_eq!(checkpoint_path(Path::new("model.mpk")), PathBuf::from("model.mpk"));
        assert_eq!(checkpoint_path(Path::new("out/model")), PathBuf::from("out/model.mpk"));
        assert_eq!(checkpoint_path(Path::new("model.pt")), PathBuf::from("model.pt.mpk"));
        assert_eq!(checkpoint_path(Path::new("run.v1")), PathBuf::from("run.v1.mpk"));
    }

    #[test]
    fn test_versioned_checkpoints_stay_distinct() {
        let dir = TempDir::new().unwrap();
        let device = Default::default();
        let model = ConvNetConfig::new().init::<TestBackend>(&device);

        let v1 = save_model(&model, &dir.path().join("run.v1")).unwrap();
        let v2 = save_model(&model, &dir.path().join("run.v2")).unwrap();

        assert_ne!(v1, v2);
        assert!(v1.exists() && v2.exists());
    }

    #[test]
    fn test_save_then_restore_gives_same_outputs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.mpk");
        let device = Default::default();
        let config = ConvNetConfig::new();

        let model = config.init::<TestBackend>(&device);
        save_model(&model, &path).unwrap();

        let (restored, origin) = load_or_init::<TestBackend>(&config, &path, &device).unwrap();
        assert_eq!(origin, ModelOrigin::Restored(path.clone()));

        let input = Tensor::<TestBackend, 4>::random([2, 1, 28, 28], Distribution::Default, &device);
        let expected = model.forward(input.clone()).into_data().to_vec::<f32>().unwrap();
        let actual = restored.forward(input).into_data().to_vec::<f32>().unwrap();

        for (a, b) in expected.iter().zip(&actual) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_checkpoint_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let device = Default::default();

        let (_, origin) =
            load_or_init::<TestBackend>(&ConvNetConfig::new(), &dir.path().join("model.mpk"), &device)
                .unwrap();
        assert_eq!(origin, ModelOrigin::Fresh);
    }

    #[test]
    fn test_corrupt_checkpoint_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.mpk");
        fs::write(&path, b"not a model").unwrap();
        let device = Default::default();

        let result = load_or_init::<TestBackend>(&ConvNetConfig::new(), &path, &device);
        assert!(matches!(result, Err(MnistError::Model(_))));
    }
}
