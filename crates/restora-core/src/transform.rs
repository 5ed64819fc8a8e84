use std::path::{Path, PathBuf};

use async_trait::async_trait;
use restora_types::TransformOptions;

use crate::error::CoreError;

/// The image transform the pipeline runs between download and upload.
///
/// Implementations read `input`, write their result somewhere under
/// `output_dir`, and return the produced file's path. They must bound their
/// own run time and report failures as [`CoreError::Transform`].
#[async_trait]
pub trait ArtifactTransform: Send + Sync + 'static {
    async fn transform(
        &self,
        input: &Path,
        output_dir: &Path,
        options: &TransformOptions,
    ) -> Result<PathBuf, CoreError>;
}
