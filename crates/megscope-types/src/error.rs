//! Error types for the megscope data model.

use thiserror::Error;

/// Errors that can occur when constructing or decoding model values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Channel identifiers start at 1.
    #[error("Invalid channel id: {0} (channel ids start at 1)")]
    InvalidChannelId(u32),
}

/// Result type alias using megscope-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
