//! [`ArtifactTransform`] backed by the CodeFormer inference scripts.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use restora_core::{ArtifactTransform, CoreError};
use restora_types::{Operation, TransformOptions};
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Subdirectories CodeFormer writes into, in the order they are searched.
const OUTPUT_SUBDIRS: [&str; 3] = ["final_results", "restored_imgs", "codeformer"];

/// Longest stderr tail kept in a failure detail.
const STDERR_TAIL: usize = 2000;

#[derive(Debug, Clone)]
pub struct CodeFormerTransform {
    dir: PathBuf,
    python: String,
    timeout: Duration,
}

impl CodeFormerTransform {
    pub fn new(dir: impl Into<PathBuf>, python: impl Into<String>, timeout: Duration) -> Self {
        Self { dir: dir.into(), python: python.into(), timeout }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn script_for(operation: Operation) -> &'static str {
        match operation {
            Operation::Enhance => "inference_codeformer.py",
            Operation::Colorize => "inference_colorization.py",
            Operation::Inpaint => "inference_inpainting.py",
        }
    }

    /// Whether every operation's script is present.
    pub async fn scripts_present(&self) -> bool {
        for op in [Operation::Enhance, Operation::Colorize, Operation::Inpaint] {
            let script = self.dir.join(Self::script_for(op));
            if !tokio::fs::try_exists(&script).await.unwrap_or(false) {
                return false;
            }
        }
        true
    }
}

fn os(s: impl AsRef<OsStr>) -> OsString {
    s.as_ref().to_owned()
}

/// Script arguments after the script path.
fn script_args(input: &Path, output_dir: &Path, options: &TransformOptions) -> Vec<OsString> {
    let io = |args: &mut Vec<OsString>| {
        args.extend([
            os("--input_path"),
            os(input),
            os("--output_path"),
            os(output_dir),
        ]);
    };

    let mut args: Vec<OsString> = Vec::new();
    match options {
        TransformOptions::Enhance(o) => {
            args.extend([os("-w"), os(o.fidelity_weight.to_string())]);
            io(&mut args);
            args.extend([
                os("--upscale"),
                os(o.upscale.to_string()),
                os("--detection_model"),
                os(o.detection_model.as_arg()),
            ]);
            if o.has_aligned {
                args.push(os("--has_aligned"));
            }
            if let Some(bg) = o.bg_upsampler.as_arg() {
                args.extend([os("--bg_upsampler"), os(bg)]);
            }
            if o.face_upsample {
                args.push(os("--face_upsample"));
            }
        }
        TransformOptions::Colorize(o) => {
            io(&mut args);
            args.extend([os("--upscale"), os(o.upscale.to_string())]);
        }
        TransformOptions::Inpaint(o) => {
            io(&mut args);
            args.extend([
                os("-w"),
                os(o.fidelity_weight.to_string()),
                os("--upscale"),
                os(o.upscale.to_string()),
            ]);
        }
    }
    args
}

/// First image under `final_results/`, `restored_imgs/`, `codeformer/`, then
/// `output_dir` itself. Entries are taken in name order.
pub async fn find_output_file(output_dir: &Path) -> Option<PathBuf> {
    let candidates = OUTPUT_SUBDIRS
        .iter()
        .map(|sub| output_dir.join(sub))
        .chain(std::iter::once(output_dir.to_path_buf()));

    for dir in candidates {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        let mut images = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_image && entry.file_type().await.is_ok_and(|t| t.is_file()) {
                images.push(path);
            }
        }
        images.sort();
        if let Some(first) = images.into_iter().next() {
            return Some(first);
        }
    }
    None
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[start..].to_owned()
}

#[async_trait]
impl ArtifactTransform for CodeFormerTransform {
    async fn transform(
        &self,
        input: &Path,
        output_dir: &Path,
        options: &TransformOptions,
    ) -> Result<PathBuf, CoreError> {
        // The scripts run with the CodeFormer checkout as cwd.
        let input = std::path::absolute(input)?;
        let output_dir = std::path::absolute(output_dir)?;
        tokio::fs::create_dir_all(&output_dir).await?;

        let script = Self::script_for(options.operation());
        let mut command = tokio::process::Command::new(&self.python);
        command
            .arg(self.dir.join(script))
            .args(script_args(&input, &output_dir, options))
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(python = %self.python, script, input = %input.display(), "running transform");

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(CoreError::Transform(format!(
                    "{script} timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
            Ok(Err(e)) => {
                return Err(CoreError::Transform(format!("failed to start {}: {e}", self.python)));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let tail = stderr_tail(&output.stderr);
            warn!(script, status = %output.status, stderr = %tail, "transform exited with failure");
            return Err(CoreError::Transform(format!("{script} exited with {}: {tail}", output.status)));
        }

        find_output_file(&output_dir)
            .await
            .ok_or_else(|| CoreError::Transform("output file not found".into()))
    }
}
