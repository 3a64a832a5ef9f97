//! Retriever - 인덱스 구축과 유사도 검색
//!
//! 빌드 단계(URL당 1회): 페이지 텍스트를 청킹하고 임베딩하여 인덱스를 만듭니다.
//! 질의 단계(반복 가능): 질문을 같은 프로바이더로 임베딩해 상위 k개 청크를 돌려줍니다.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::scraper::{extract_text, PageFetcher};

use super::chunker::TextSplitter;
use super::index::{ScoredChunk, VectorIndex};

// ============================================================================
// Retriever
// ============================================================================

/// 벡터 검색기
///
/// 인덱스는 한 번에 하나의 URL 콘텐츠만 담습니다.
/// 새 URL은 새 `Retriever`로 통째로 재구축합니다.
pub struct Retriever {
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("index_len", &self.index.len())
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// 정제된 텍스트로부터 인덱스 구축
    ///
    /// 임베딩 실패 시 인덱스는 만들어지지 않습니다 (부분 인덱스 없음).
    pub async fn from_text(
        text: &str,
        splitter: &TextSplitter,
        embedder: Arc<dyn EmbeddingProvider>,
        source_url: Option<String>,
    ) -> Result<Self, EmbeddingError> {
        let chunks = splitter.split_to_vec(text);
        if chunks.is_empty() {
            tracing::warn!("No chunks generated from input text");
        }

        let index = VectorIndex::build(chunks, embedder.as_ref(), source_url).await?;

        tracing::info!("Index built: {} chunks", index.len());

        Ok(Self { index, embedder })
    }

    /// URL로부터 전체 빌드 단계 수행 (fetch → clean → chunk → embed)
    ///
    /// fetch가 실패하면 청킹 전에 중단됩니다.
    pub async fn from_url(
        fetcher: &PageFetcher,
        splitter: &TextSplitter,
        embedder: Arc<dyn EmbeddingProvider>,
        url: &str,
    ) -> Result<Self> {
        let html = fetcher
            .fetch(url)
            .await
            .context("Failed to fetch web page")?;

        let text = extract_text(&html);

        Self::from_text(&text, splitter, embedder, Some(url.to_string()))
            .await
            .context("Failed to build index")
    }

    /// 질의에 대한 상위 `k`개 청크 검색
    ///
    /// 빈 인덱스는 프로바이더 호출 없이 빈 결과를 반환합니다.
    /// 질의 임베딩 실패는 `EmbeddingError`로 전파됩니다.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, EmbeddingError> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        Ok(self.index.search(&query_embedding, k))
    }

    /// 내부 인덱스 접근
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

// ============================================================================
// Tests
// ============================================================================
