//! 向量索引模块

pub mod embedding;
pub mod similarity;

pub use embedding::{EmbeddingModel, SimpleEmbeddingModel, create_embedding_model};
pub use similarity::cosine_similarity;
