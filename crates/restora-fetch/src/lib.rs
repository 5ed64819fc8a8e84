//! Remote source fetching with explicit time and size bounds.
//!
//! ```rust,ignore
//! let fetcher = Fetcher::builder().set_timeout(Duration::from_secs(30)).build()?;
//! let bytes = fetcher.download_to("https://cdn.example/uploads/42/a.jpg", &dest).await?;
//! ```

pub mod error;
pub mod fetcher;

pub use error::FetchError;
pub use fetcher::{Fetcher, FetcherBuilder, RemoteSource};
