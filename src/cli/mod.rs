//! CLI 모듈
//!
//! webqa-rag 명령어 정의 및 구현.
//! `ask`는 단발 질문, `chat`은 대화형 루프입니다.
//! 오류는 종료 코드가 아니라 메시지로 표시됩니다.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{has_api_key, AppConfig};
use crate::embedding::OpenAiEmbedding;
use crate::knowledge::{Retriever, TextSplitter};
use crate::qa::{OpenAiChat, QaEngine, QaResponse};
use crate::scraper::{extract_text, extract_title, PageFetcher};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "webqa-rag")]
#[command(version, about = "웹 페이지 질의응답 RAG CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// URL을 로드하고 질문 하나에 답변
    Ask {
        /// 로드할 웹 페이지 URL
        #[arg(short, long)]
        url: String,

        /// 질문
        question: String,

        /// 검색할 청크 개수 (기본: 설정의 TOP_K)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// 대화형 질의응답 루프 ('quit'으로 종료)
    Chat {
        /// 로드할 웹 페이지 URL (생략 시 프롬프트로 입력)
        #[arg(short, long)]
        url: Option<String>,
    },
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask { url, question, k } => cmd_ask(&url, &question, k).await,
        Commands::Chat { url } => cmd_chat(url).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 단발 질문 명령어 (ask)
///
/// URL을 로드해 인덱스를 만들고 질문 하나에 답한 뒤 종료합니다.
async fn cmd_ask(url: &str, question: &str, k: Option<usize>) -> Result<()> {
    ensure_api_key()?;

    let config = AppConfig::from_env().context("설정 로드 실패")?;
    let k = k.unwrap_or(config.top_k);

    // URL 형식 확인
    url::Url::parse(url).with_context(|| format!("잘못된 URL: {}", url))?;

    let fetcher = PageFetcher::new().context("PageFetcher 생성 실패")?;
    let splitter = TextSplitter::new(config.chunk_config()).context("청킹 설정 오류")?;
    let embedder = Arc::new(OpenAiEmbedding::from_env(&config)?);

    println!("[*] 페이지 로드 중: {}", url);
    tracing::debug!(
        "Chunking settings: size={}, overlap={}",
        splitter.config().chunk_size,
        splitter.config().overlap
    );

    // 빌드 실패는 종료 코드가 아니라 메시지로 표시
    let retriever = match Retriever::from_url(&fetcher, &splitter, embedder, url).await {
        Ok(retriever) => retriever,
        Err(e) => {
            tracing::warn!("Page load failed: {:#}", e);
            if e.downcast_ref::<crate::scraper::FetchError>().is_some() {
                println!("Failed to fetch web page content.");
            } else {
                println!("Failed to process web page content.");
            }
            return Ok(());
        }
    };

    println!("[*] 인덱스 구축 완료: {} 청크", retriever.index().len());

    let chat = Arc::new(OpenAiChat::from_env(&config)?);
    let engine = QaEngine::new(chat);

    let response = answer_question(&engine, &retriever, question, k, Some(url)).await;

    println!("\nAnswer: {}", response.display_text());
    print_sources(&response);

    Ok(())
}

/// 대화형 명령어 (chat)
///
/// URL 하나를 로드한 뒤 'quit'까지 질문을 반복해서 받습니다.
/// 질문 사이에 대화 기억은 없습니다 - 인덱스만 공유됩니다.
async fn cmd_chat(url: Option<String>) -> Result<()> {
    ensure_api_key()?;

    let config = AppConfig::from_env().context("설정 로드 실패")?;

    let url = match url {
        Some(url) => url,
        None => match read_line("Enter the URL of the web page to load: ")? {
            Some(line) => line,
            // stdin EOF
            None => return Ok(()),
        },
    };
    let url = url.trim().to_string();
    if url.is_empty() {
        bail!("URL이 입력되지 않았습니다");
    }

    let fetcher = PageFetcher::new().context("PageFetcher 생성 실패")?;
    let splitter = TextSplitter::new(config.chunk_config()).context("청킹 설정 오류")?;
    let embedder = Arc::new(OpenAiEmbedding::from_env(&config)?);

    // 빌드 단계: fetch가 실패하면 청킹 전에 중단
    let html = match fetcher.fetch(&url).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Fetch failed: {}", e);
            println!("Failed to fetch web page content.");
            return Ok(());
        }
    };

    if let Some(title) = extract_title(&html) {
        println!("[*] 페이지: {}", title);
    }

    let text = extract_text(&html);
    let retriever = match Retriever::from_text(
        &text,
        &splitter,
        embedder,
        Some(url.clone()),
    )
    .await
    {
        Ok(retriever) => retriever,
        Err(e) => {
            tracing::warn!("Index build failed: {}", e);
            println!("Failed to process web page content.");
            return Ok(());
        }
    };

    println!("[*] 인덱스 구축 완료: {} 청크", retriever.index().len());

    let chat = Arc::new(OpenAiChat::from_env(&config)?);
    let engine = QaEngine::new(chat);

    // 질의 루프: 한 번에 질문 하나씩 처리, stdin EOF면 종료
    loop {
        let Some(question) =
            read_line("Ask a question about the web page (or 'quit' to exit): ")?
        else {
            break;
        };
        let question = question.trim();

        if question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let response =
            answer_question(&engine, &retriever, question, config.top_k, Some(&url)).await;

        println!("\nAnswer: {}\n", response.display_text());
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 검색 + 답변 생성
///
/// 검색 실패(질의 임베딩 오류)도 폴백 응답으로 내려갑니다.
async fn answer_question(
    engine: &QaEngine,
    retriever: &Retriever,
    question: &str,
    k: usize,
    source_url: Option<&str>,
) -> QaResponse {
    let retrieved = match retriever.retrieve(question, k).await {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!("Retrieval failed: {}", e);
            return QaResponse::GenerationFailed;
        }
    };

    engine.ask(question, &retrieved, source_url).await
}

/// API 키 확인
fn ensure_api_key() -> Result<()> {
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export OPENAI_API_KEY=your-api-key\n\n\
             API 키 발급: https://platform.openai.com/api-keys"
        );
    }
    Ok(())
}

/// 소스 청크 미리보기 출력
fn print_sources(response: &QaResponse) {
    let sources = response.sources();
    if sources.is_empty() {
        return;
    }

    println!("\n[*] 사용된 청크 ({} 건):", sources.len());
    for source in sources {
        println!(
            "  #{} [점수: {:.4}] {}",
            source.chunk_index,
            source.score,
            truncate_text(&source.chunk_text, 120)
        );
    }
}

/// 프롬프트를 표시하고 한 줄 입력받기 (EOF면 `None`)
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush().context("stdout flush 실패")?;

    read_line_from(&mut std::io::stdin().lock())
}

/// reader에서 한 줄 읽기
///
/// EOF(0 바이트)는 `None`으로 구분합니다. 파이프 입력이 소진되거나
/// Ctrl-D가 눌리면 호출자가 루프를 끝낼 수 있어야 합니다.
fn read_line_from(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let bytes = reader.read_line(&mut line).context("stdin 읽기 실패")?;

    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================
