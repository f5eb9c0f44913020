//! Embedding generation for indexing and retrieval.
//!
//! Providers distinguish document (indexing) calls from query calls; some
//! models embed the two differently and mixing them degrades retrieval.

mod gemini;
mod openai;

pub use gemini::{GeminiEmbedder, GEMINI_API_BASE};
pub use openai::OpenAIEmbedder;

use crate::error::{PitwallError, Result, Stage};
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed texts for storage in the index, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text for storage in the index.
    async fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PitwallError::unavailable(Stage::Embedding, "Empty embedding response"))
    }

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Model identifier.
    fn model(&self) -> &str;
}

/// Check that a provider returned one vector per input, each of the configured length.
pub(crate) fn check_vectors(vectors: &[Vec<f32>], inputs: usize, dimensions: usize) -> Result<()> {
    if vectors.len() != inputs {
        return Err(PitwallError::unavailable(
            Stage::Embedding,
            format!("{} embeddings returned for {} inputs", vectors.len(), inputs),
        ));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(PitwallError::unavailable(
            Stage::Embedding,
            format!("expected {} dimensions, got {}", dimensions, bad.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl Embedder for Fixed {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_embed_document_uses_document_path() {
        let v = Fixed.embed_document("abc").await.unwrap();
        assert_eq!(v, vec![3.0, 1.0]);
    }

    #[test]
    fn test_check_vectors() {
        assert!(check_vectors(&[vec![0.0; 3]], 1, 3).is_ok());

        let err = check_vectors(&[vec![0.0; 2]], 1, 3).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Embedding));

        assert!(check_vectors(&[], 1, 3).is_err());
    }
}
