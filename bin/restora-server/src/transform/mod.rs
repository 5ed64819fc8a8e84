//! Image transforms the server can run.

pub mod codeformer;

pub use codeformer::CodeFormerTransform;
