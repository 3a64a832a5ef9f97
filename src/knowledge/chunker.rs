//! 텍스트 청킹 모듈
//!
//! 텍스트를 오버랩이 있는 청크 시퀀스로 분할합니다.
//! 분할 지점은 문단 → 문장 → 단어 경계를 우선하고,
//! 경계가 없으면 `chunk_size` 문자에서 강제로 자릅니다.
//!
//! 불변식: 연속 청크는 정확히 `overlap` 문자를 공유하며,
//! 첫 청크 + 이후 청크들의 오버랩을 제거한 부분을 이어붙이면
//! 입력 텍스트가 빠짐없이 복원됩니다.

use anyhow::Result;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정 (단위: 문자 수)
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    /// 목표 청크 크기
    pub chunk_size: usize,
    /// 청크 간 오버랩 (`chunk_size`보다 작아야 함)
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

// ============================================================================
// TextSplitter
// ============================================================================

/// 텍스트 분할기
pub struct TextSplitter {
    config: ChunkConfig,
}

impl TextSplitter {
    /// 설정으로 생성
    ///
    /// `chunk_size == 0` 또는 `overlap >= chunk_size`이면 에러입니다.
    pub fn new(config: ChunkConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than 0");
        }
        if config.overlap >= config.chunk_size {
            anyhow::bail!(
                "overlap ({}) must be smaller than chunk_size ({})",
                config.overlap,
                config.chunk_size
            );
        }
        Ok(Self { config })
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }

    /// 현재 설정
    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// 텍스트를 청크 시퀀스로 분할 (lazy iterator)
    ///
    /// 빈 텍스트는 빈 시퀀스, `chunk_size` 이하 텍스트는 입력 전체가
    /// 유일한 청크입니다. 매 호출마다 새 iterator를 반환합니다.
    pub fn split<'a>(&self, text: &'a str) -> Chunks<'a> {
        let mut offsets: Vec<usize> = Vec::with_capacity(text.len() + 1);
        let mut chars: Vec<char> = Vec::with_capacity(text.len());

        for (offset, ch) in text.char_indices() {
            offsets.push(offset);
            chars.push(ch);
        }
        offsets.push(text.len());

        Chunks {
            text,
            offsets,
            chars,
            pos: 0,
            chunk_size: self.config.chunk_size,
            overlap: self.config.overlap,
        }
    }

    /// 청크를 소유 문자열로 수집
    pub fn split_to_vec(&self, text: &str) -> Vec<String> {
        self.split(text).map(str::to_string).collect()
    }
}

// ============================================================================
// Chunks Iterator
// ============================================================================

/// 청크 iterator
///
/// 입력 텍스트의 슬라이스를 순서대로 반환합니다. `Clone`으로 재시작할 수 있습니다.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    /// 문자별 바이트 오프셋 + 끝 오프셋
    offsets: Vec<usize>,
    chars: Vec<char>,
    /// 다음 청크의 시작 문자 인덱스
    pos: usize,
    chunk_size: usize,
    overlap: usize,
}

impl<'a> Chunks<'a> {
    /// 윈도우 내 분할 지점 결정 (문자 인덱스, exclusive)
    ///
    /// 문단(`\n\n`) → 문장 끝 → 공백 순으로 찾고, 없으면 `hard_end`입니다.
    /// 진행을 보장하려고 윈도우 후반부에서만 자릅니다.
    fn find_cut(&self, start: usize, hard_end: usize) -> usize {
        let min_cut = start + (self.chunk_size / 2).max(self.overlap + 1);

        // 문단 경계: "\n\n" 직후
        for cut in (min_cut..=hard_end).rev() {
            if cut >= 2 && self.chars[cut - 1] == '\n' && self.chars[cut - 2] == '\n' {
                return cut;
            }
        }

        // 문장 경계: 종결 부호 + 공백 직후
        for cut in (min_cut..=hard_end).rev() {
            if cut >= 2
                && matches!(self.chars[cut - 2], '.' | '!' | '?')
                && self.chars[cut - 1].is_whitespace()
            {
                return cut;
            }
        }

        // 단어 경계: 공백 직후
        for cut in (min_cut..=hard_end).rev() {
            if cut >= 1 && self.chars[cut - 1].is_whitespace() {
                return cut;
            }
        }

        hard_end
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let total = self.chars.len();
        if self.pos >= total {
            return None;
        }

        let start = self.pos;

        // 남은 텍스트가 청크 크기 이하이면 마지막 청크
        if total - start <= self.chunk_size {
            self.pos = total;
            return Some(&self.text[self.offsets[start]..]);
        }

        let hard_end = start + self.chunk_size;
        let cut = self.find_cut(start, hard_end);

        // 다음 청크는 정확히 overlap 문자만큼 겹쳐서 시작
        self.pos = cut - self.overlap;

        Some(&self.text[self.offsets[start]..self.offsets[cut]])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(ChunkConfig {
            chunk_size,
            overlap,
        })
        .expect("valid config")
    }

    /// 오버랩을 제거하고 이어붙이면 입력이 정확히 복원되어야 함
    fn assert_full_coverage(text: &str, chunks: &[&str], overlap: usize) {
        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                rebuilt.push_str(chunk);
            } else {
                rebuilt.extend(chunk.chars().skip(overlap));
            }
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_config_accessor() {
        let splitter = splitter(100, 20);
        assert_eq!(splitter.config().chunk_size, 100);
        assert_eq!(splitter.config().overlap, 20);
    }

    #[test]
    fn test_empty_text() {
        let splitter = splitter(100, 20);
        assert_eq!(splitter.split("").count(), 0);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = splitter(100, 20);
        let chunks: Vec<&str> = splitter.split("A short paragraph.").collect();
        assert_eq!(chunks, vec!["A short paragraph."]);
    }

    #[test]
    fn test_exact_size_single_chunk() {
        let splitter = splitter(10, 3);
        let text = "abcdefghij"; // 정확히 10 문자
        let chunks: Vec<&str> = splitter.split(text).collect();
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let splitter = splitter(10, 3);
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks: Vec<&str> = splitter.split(text).collect();

        assert_eq!(chunks, vec!["abcdefghij", "hijklmnopq", "opqrstuvwx", "vwxyz"]);
        assert_full_coverage(text, &chunks, 3);
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let splitter = splitter(50, 10);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(10);
        let chunks: Vec<&str> = splitter.split(&text).collect();
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count() - 10)
                .collect();
            let next_head: String = pair[1].chars().take(10).collect();
            assert_eq!(prev_tail, next_head);
        }
        assert_full_coverage(&text, &chunks, 10);
    }

    #[test]
    fn test_full_coverage_long_text() {
        let splitter = splitter(200, 40);
        let text =
            "Rust is a systems programming language. It is fast and memory safe.\n\n".repeat(30);
        let chunks: Vec<&str> = splitter.split(&text).collect();
        assert!(chunks.len() > 1);
        assert_full_coverage(&text, &chunks, 40);

        // 모든 청크는 chunk_size 이하
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
        }
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let splitter = splitter(40, 5);
        let text = "First sentence here. Second one follows. Third keeps going on and on.";
        let chunks: Vec<&str> = splitter.split(text).collect();

        // 첫 청크는 강제 컷이 아니라 문장 경계에서 끝나야 함
        assert!(chunks[0].trim_end().ends_with('.'));
        assert_full_coverage(text, &chunks, 5);
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let splitter = splitter(60, 10);
        let para = "Words fill this paragraph with content";
        let text = format!("{}\n\n{} and then some more trailing text here", para, para);
        let chunks: Vec<&str> = splitter.split(&text).collect();

        assert!(chunks[0].ends_with("\n\n"));
        assert_full_coverage(&text, &chunks, 10);
    }

    #[test]
    fn test_restartable() {
        let splitter = splitter(30, 5);
        let text = "One two three four five six seven eight nine ten eleven twelve.";
        let first: Vec<&str> = splitter.split(text).collect();
        let second: Vec<&str> = splitter.split(text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unicode_text() {
        let splitter = splitter(20, 4);
        let text = "러스트는 시스템 프로그래밍 언어입니다. 빠르고 메모리 안전합니다. 동시성도 훌륭합니다.";
        let chunks: Vec<&str> = splitter.split(text).collect();
        assert!(chunks.len() > 1);
        assert_full_coverage(text, &chunks, 4);
    }

    #[test]
    fn test_zero_overlap() {
        let splitter = splitter(10, 0);
        let text = "abcdefghijklmnopqrst";
        let chunks: Vec<&str> = splitter.split(text).collect();
        assert_eq!(chunks, vec!["abcdefghij", "klmnopqrst"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(TextSplitter::new(ChunkConfig {
            chunk_size: 0,
            overlap: 0
        })
        .is_err());
        assert!(TextSplitter::new(ChunkConfig {
            chunk_size: 100,
            overlap: 100
        })
        .is_err());
        assert!(TextSplitter::new(ChunkConfig {
            chunk_size: 100,
            overlap: 150
        })
        .is_err());
    }

    #[test]
    fn test_split_to_vec() {
        let splitter = splitter(100, 20);
        let chunks = splitter.split_to_vec("Tiny input.");
        assert_eq!(chunks, vec!["Tiny input.".to_string()]);
    }
}
