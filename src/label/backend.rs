use anyhow::Result;

/// A black-box transformation that assigns speaker roles to (and optionally
/// translates) one chunk of transcript text.
///
/// Each call is stateless: the backend sees the chunk text and its position
/// in the split, never the output of earlier chunks.
pub trait LabelingBackend: Send {
    fn name(&self) -> &str;
    fn label(&self, chunk_text: &str, index: usize, total: usize) -> Result<String>;
}
