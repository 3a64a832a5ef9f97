//! 인메모리 벡터 인덱스
//!
//! 한 URL의 청크들과 임베딩을 보관하는 단순 선형 인덱스입니다.
//! 영속화 없음, 증분 갱신 없음 - 새 URL을 로드하면 통째로 재구축합니다.
//! 스레드 안전을 의도하지 않습니다.

use crate::embedding::{EmbeddingError, EmbeddingProvider};

// ============================================================================
// Types
// ============================================================================

/// 인덱스 엔트리 (청크 + 임베딩)
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// 청크 순번 (0-based)
    pub chunk_index: usize,
    /// 청크 텍스트
    pub chunk_text: String,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과 (청크 + 유사도)
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// 청크 순번
    pub chunk_index: usize,
    /// 청크 텍스트
    pub chunk_text: String,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub score: f32,
}

// ============================================================================
// VectorIndex
// ============================================================================

/// 인메모리 벡터 인덱스
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    source_url: Option<String>,
}

impl VectorIndex {
    /// 청크들을 임베딩하여 인덱스 구축
    ///
    /// 임베딩 호출이 하나라도 실패하면 인덱스는 만들어지지 않습니다
    /// (부분 인덱스 없음). 중복 청크 텍스트도 그대로 임베딩합니다.
    pub async fn build(
        chunks: Vec<String>,
        embedder: &dyn EmbeddingProvider,
        source_url: Option<String>,
    ) -> Result<Self, EmbeddingError> {
        if chunks.is_empty() {
            return Ok(Self {
                entries: Vec::new(),
                source_url,
            });
        }

        tracing::info!(
            "Embedding {} chunks with {}",
            chunks.len(),
            embedder.name()
        );

        let embeddings = embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::Response(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk_text, embedding))| IndexEntry {
                chunk_index: i,
                chunk_text,
                embedding,
            })
            .collect();

        Ok(Self {
            entries,
            source_url,
        })
    }

    /// 쿼리 벡터와의 코사인 유사도 기준 상위 `k`개 청크
    ///
    /// 유사도 내림차순으로 정렬됩니다. 빈 인덱스는 빈 결과를 반환합니다.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut results: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk_index: entry.chunk_index,
                chunk_text: entry.chunk_text.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        results
    }

    /// 인덱스된 청크 개수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 인덱스가 비어 있는지
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 인덱스를 구축한 원본 URL
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 빈 벡터,
/// 또는 영벡터가 포함되면 0.0을 반환합니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
