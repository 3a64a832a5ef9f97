//! Knowledge 모듈 - 청킹, 벡터 인덱스, 검색
//!
//! - Chunker: 오버랩이 있는 문자 단위 텍스트 분할
//! - Index: 인메모리 (청크, 임베딩) 인덱스 + 코사인 유사도
//! - Retriever: 빌드 단계와 질의 단계를 묶는 검색기

mod chunker;
mod index;
mod retriever;

// Re-exports
pub use chunker::{ChunkConfig, Chunks, TextSplitter};
pub use index::{cosine_similarity, IndexEntry, ScoredChunk, VectorIndex};
pub use retriever::Retriever;
