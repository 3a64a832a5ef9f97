//! webqa-rag - 웹 페이지 질의응답 RAG CLI
//!
//! 웹 페이지를 로드하여 청크로 분할하고, 임베딩 기반 인메모리 벡터 인덱스를
//! 구축한 뒤, 검색된 청크를 컨텍스트로 LLM에 전달하여 질문에 답변합니다.
//!
//! 파이프라인: Fetcher → Cleaner → Chunker → Index (URL당 1회),
//! 이후 질문마다: Retriever → Answerer

pub mod cli;
pub mod config;
pub mod embedding;
pub mod knowledge;
pub mod qa;
pub mod scraper;

// Re-exports
pub use config::{get_api_key, has_api_key, AppConfig};
pub use embedding::{EmbeddingError, EmbeddingProvider, OpenAiEmbedding};
pub use knowledge::{
    cosine_similarity, ChunkConfig, Chunks, IndexEntry, Retriever, ScoredChunk, TextSplitter,
    VectorIndex,
};
pub use qa::{ChatProvider, GenerationError, OpenAiChat, QaEngine, QaResponse};
pub use scraper::{extract_text, extract_title, FetchError, PageFetcher};
