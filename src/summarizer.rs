use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::extractor::ExtractedArticle;
use crate::llm::{LlmError, TextGenerator};
use crate::retry::{RetryPolicy, retry};

/// Upper bound on article characters sent to the model.
pub const MAX_PROMPT_BODY_CHARS: usize = 50_000;

/// Title used in the prompt and the response when the page has none.
pub const UNTITLED: &str = "タイトルなし";

#[derive(Debug, Clone, Copy)]
pub struct SummarizerConfig {
    pub retry: RetryPolicy,
    pub max_body_chars: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_body_chars: MAX_PROMPT_BODY_CHARS,
        }
    }
}

/// Produces three-point Japanese summaries through a [`TextGenerator`].
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: SummarizerConfig) -> Self {
        Self { generator, config }
    }

    /// Fails with [`AppError::MissingCredential`] when the generator has no key.
    pub fn ensure_configured(&self) -> Result<()> {
        if self.generator.is_configured() {
            Ok(())
        } else {
            Err(AppError::MissingCredential)
        }
    }

    pub async fn summarize(&self, article: &ExtractedArticle) -> std::result::Result<String, LlmError> {
        let prompt = build_prompt(
            article.title.as_deref(),
            &article.body_text,
            self.config.max_body_chars,
        );
        tracing::debug!(prompt_chars = prompt.chars().count(), "Built prompt");

        retry(self.config.retry, LlmError::is_overloaded, |attempt| {
            let prompt = &prompt;
            async move {
                tracing::info!(attempt, "Requesting summary");
                self.generator.generate(prompt).await
            }
        })
        .await
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(title: Option<&str>, body: &str, max_body_chars: usize) -> String {
    let body = truncate_chars(body, max_body_chars);
    let title = title.filter(|t| !t.trim().is_empty()).unwrap_or(UNTITLED);

    let mut prompt = String::with_capacity(body.len() + 512);
    prompt.push_str("以下の記事を3つの要点で簡潔に要約してください。\n");
    prompt.push_str("各要点は1〜2文で簡潔にまとめてください。\n\n");
    prompt.push_str(
        "【重要】入力されたテキストが英語やその他の言語であっても、必ず日本語で要約を作成してください。\n\n",
    );
    prompt.push_str("記事タイトル: ");
    prompt.push_str(title);
    prompt.push_str("\n\n記事本文:\n");
    prompt.push_str(body);
    prompt.push_str("\n\n要約形式（必ず日本語で記述）:\n");
    prompt.push_str("1. （第一の要点）\n");
    prompt.push_str("2. （第二の要点）\n");
    prompt.push_str("3. （第三の要点）");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    struct ScriptedGenerator {
        replies: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
        calls: AtomicUsize,
        called_at: Mutex<Vec<Instant>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<std::result::Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                called_at: Mutex::new(Vec::new()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn is_configured(&self) -> bool {
            true
        }

        async fn generate(&self, prompt: &str) -> std::result::Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.called_at.lock().unwrap().push(Instant::now());
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("1. a\n2. b\n3. c".into()))
        }
    }

    fn article(body: &str) -> ExtractedArticle {
        ExtractedArticle {
            title: Some("Title".into()),
            body_text: body.into(),
        }
    }

    #[test]
    fn prompt_asks_for_three_japanese_points() {
        let prompt = build_prompt(Some("Rust 1.0"), "Body text.", MAX_PROMPT_BODY_CHARS);
        assert!(prompt.contains("記事タイトル: Rust 1.0"));
        assert!(prompt.contains("必ず日本語で"));
        assert!(prompt.contains("1. （第一の要点）"));
        assert!(prompt.contains("3. （第三の要点）"));
        assert!(prompt.contains("Body text."));
    }

    #[test]
    fn prompt_uses_placeholder_title() {
        let prompt = build_prompt(None, "Body", MAX_PROMPT_BODY_CHARS);
        assert!(prompt.contains(&format!("記事タイトル: {}", UNTITLED)));
        let prompt = build_prompt(Some("  "), "Body", MAX_PROMPT_BODY_CHARS);
        assert!(prompt.contains(&format!("記事タイトル: {}", UNTITLED)));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = format!("{}{}", "a".repeat(MAX_PROMPT_BODY_CHARS), "b".repeat(10_000));
        let prompt = build_prompt(None, &body, MAX_PROMPT_BODY_CHARS);
        assert!(prompt.contains(&"a".repeat(MAX_PROMPT_BODY_CHARS)));
        assert!(!prompt.contains('b'));
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[tokio::test]
    async fn missing_credential_is_reported() {
        struct Unconfigured;

        #[async_trait]
        impl TextGenerator for Unconfigured {
            fn is_configured(&self) -> bool {
                false
            }

            async fn generate(&self, _prompt: &str) -> std::result::Result<String, LlmError> {
                Err(LlmError::MissingApiKey)
            }
        }

        let summarizer = Summarizer::new(Arc::new(Unconfigured), SummarizerConfig::default());
        assert!(matches!(
            summarizer.ensure_configured(),
            Err(AppError::MissingCredential)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn overload_is_retried_until_success() {
        let generator = ScriptedGenerator::new(vec![
            Err(LlmError::Overloaded("The model is overloaded".into())),
            Err(LlmError::Overloaded("The model is overloaded".into())),
            Ok("1. x\n2. y\n3. z".into()),
        ]);
        let summarizer = Summarizer::new(generator.clone(), SummarizerConfig::default());

        let summary = summarizer.summarize(&article("body")).await.unwrap();

        assert_eq!(summary, "1. x\n2. y\n3. z");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        let called_at = generator.called_at.lock().unwrap();
        let first_gap = called_at[1] - called_at[0];
        let second_gap = called_at[2] - called_at[1];
        assert!(first_gap >= Duration::from_secs(2));
        assert!(second_gap > first_gap);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let generator = ScriptedGenerator::new(vec![Err(LlmError::Api {
            status: 500,
            message: "Internal error".into(),
        })]);
        let summarizer = Summarizer::new(generator.clone(), SummarizerConfig::default());

        let err = summarizer.summarize(&article("body")).await.unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 500, .. }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_overload_returns_last_error() {
        let generator = ScriptedGenerator::new(vec![
            Err(LlmError::Overloaded("first".into())),
            Err(LlmError::Overloaded("second".into())),
            Err(LlmError::Overloaded("third".into())),
        ]);
        let summarizer = Summarizer::new(generator.clone(), SummarizerConfig::default());

        let err = summarizer.summarize(&article("body")).await.unwrap_err();

        assert!(matches!(err, LlmError::Overloaded(ref msg) if msg == "third"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn prompt_sent_to_provider_is_bounded() {
        let generator = ScriptedGenerator::new(vec![]);
        let summarizer = Summarizer::new(generator.clone(), SummarizerConfig::default());
        let body = "x".repeat(60_000);

        summarizer.summarize(&article(&body)).await.unwrap();

        let prompts = generator.prompts.lock().unwrap();
        let sent_body_chars = prompts[0].chars().filter(|c| *c == 'x').count();
        assert_eq!(sent_body_chars, MAX_PROMPT_BODY_CHARS);
    }
}
