// src/domain/link/mod.rs
//
// URL identity
//
// A raw URL is reduced to a canonical string and a platform tag.
// The canonical string is the ONLY input to post identity.

pub mod extract;
pub mod normalizer;
pub mod platform;

pub use extract::{ExtractedLink, LinkExtractor};
pub use normalizer::{normalize, NormalizedUrl};
pub use platform::Platform;
