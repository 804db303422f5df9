pub mod attributes;
pub mod rewriter;

pub use rewriter::{Endpoint, PlaylistLine, PlaylistRewriter, is_audio_rendition};
