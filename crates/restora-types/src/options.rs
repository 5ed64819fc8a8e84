//! Per-operation transform parameters and their declared bounds.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The three transforms the processing service offers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
    strum::Display, strum::AsRefStr, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Enhance,
    Colorize,
    Inpaint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum BgUpsampler {
    #[default]
    #[serde(rename = "realesrgan")]
    Realesrgan,
    #[serde(rename = "none")]
    None,
}

impl BgUpsampler {
    pub fn as_arg(&self) -> Option<&'static str> {
        match self {
            BgUpsampler::Realesrgan => Some("realesrgan"),
            BgUpsampler::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum DetectionModel {
    #[default]
    #[serde(rename = "retinaface_resnet50")]
    RetinafaceResnet50,
    #[serde(rename = "retinaface_mobile0.25")]
    RetinafaceMobile025,
    #[serde(rename = "YOLOv5l")]
    Yolov5l,
    #[serde(rename = "YOLOv5n")]
    Yolov5n,
    #[serde(rename = "dlib")]
    Dlib,
}

impl DetectionModel {
    pub fn as_arg(&self) -> &'static str {
        match self {
            DetectionModel::RetinafaceResnet50 => "retinaface_resnet50",
            DetectionModel::RetinafaceMobile025 => "retinaface_mobile0.25",
            DetectionModel::Yolov5l => "YOLOv5l",
            DetectionModel::Yolov5n => "YOLOv5n",
            DetectionModel::Dlib => "dlib",
        }
    }
}

pub const MIN_UPSCALE: u32 = 1;
pub const MAX_UPSCALE: u32 = 4;

/// Face restoration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct EnhanceOptions {
    /// Balance between quality (0) and fidelity (1).
    pub fidelity_weight: f32,
    pub upscale: u32,
    /// Input faces are already cropped and aligned.
    pub has_aligned: bool,
    pub bg_upsampler: BgUpsampler,
    pub face_upsample: bool,
    pub detection_model: DetectionModel,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            fidelity_weight: 0.7,
            upscale: 2,
            has_aligned: false,
            bg_upsampler: BgUpsampler::Realesrgan,
            face_upsample: true,
            detection_model: DetectionModel::RetinafaceResnet50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ColorizeOptions {
    pub upscale: u32,
}

impl Default for ColorizeOptions {
    fn default() -> Self {
        Self { upscale: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct InpaintOptions {
    pub fidelity_weight: f32,
    pub upscale: u32,
}

impl Default for InpaintOptions {
    fn default() -> Self {
        Self { fidelity_weight: 0.5, upscale: 2 }
    }
}

/// Operation plus its parameters, as stored on a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum TransformOptions {
    Enhance(EnhanceOptions),
    Colorize(ColorizeOptions),
    Inpaint(InpaintOptions),
}

impl TransformOptions {
    pub fn operation(&self) -> Operation {
        match self {
            TransformOptions::Enhance(_) => Operation::Enhance,
            TransformOptions::Colorize(_) => Operation::Colorize,
            TransformOptions::Inpaint(_) => Operation::Inpaint,
        }
    }

    /// Check every numeric parameter against its declared bounds.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TransformOptions::Enhance(o) => {
                check_weight(o.fidelity_weight)?;
                check_upscale(o.upscale)
            }
            TransformOptions::Colorize(o) => check_upscale(o.upscale),
            TransformOptions::Inpaint(o) => {
                check_weight(o.fidelity_weight)?;
                check_upscale(o.upscale)
            }
        }
    }
}

fn check_weight(w: f32) -> Result<(), String> {
    // NaN fails the range check as well.
    if (0.0..=1.0).contains(&w) {
        Ok(())
    } else {
        Err(format!("fidelity_weight must be within [0, 1], got {w}"))
    }
}

fn check_upscale(u: u32) -> Result<(), String> {
    if (MIN_UPSCALE..=MAX_UPSCALE).contains(&u) {
        Ok(())
    } else {
        Err(format!("upscale must be within [{MIN_UPSCALE}, {MAX_UPSCALE}], got {u}"))
    }
}
