use thiserror::Error;

/// Errors surfaced across the inpainting core.
///
/// Per-target failures (`NoAdmissibleCandidate`, a single `InsufficientSources`
/// probe) are recovered locally by the driver; only the variants that reach
/// a caller are constructed outside of `driver`/`search`.
#[derive(Debug, Error)]
pub enum InpaintError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("requested {requested} KNN candidates but only {found} source patches exist")]
    InsufficientSources { requested: usize, found: usize },

    #[error("refiner rejected every candidate for the target patch at ({x}, {y})")]
    NoAdmissibleCandidate { x: usize, y: usize },

    #[error("iteration {iteration} completed with no paint: all boundary targets were skipped")]
    NoProgress { iteration: usize },

    #[error("inpainting cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },

    #[cfg(feature = "im-io")]
    #[error("image I/O error: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "im-io")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InpaintError>;
