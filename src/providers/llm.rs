//! OpenAI兼容的LLM客户端 - 精炼、过滤与流式总结

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::LLMConfig;
use crate::providers::{LLMProvider, ScrapedDocument, SearchResult};

const REFINE_SYSTEM_PROMPT: &str = "You are an OSINT analyst assistant. Rewrite the user's \
investigation query into a short keyword search expression suited to dark web index engines. \
Reply with the refined query only, no explanation.";

const FILTER_SYSTEM_PROMPT: &str = "You are an OSINT analyst assistant. You will receive an \
investigation query and a JSON list of search results. Decide which results are worth scraping \
for the investigation. Reply with a JSON array containing the URLs to keep, nothing else.";

const SUMMARIZE_SYSTEM_PROMPT: &str = "You are an OSINT analyst. Write a structured Markdown \
intelligence report answering the investigation query from the scraped dark web content. \
Cite source URLs, call out threats and keep an objective tone.";

/// LLM客户端
pub struct LLMClient {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if !self.config.api_key.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        )
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.config.retry_attempts;
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries, max_retries, err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// 单轮对话
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.retry_with_backoff(|| async { self.chat_once(system_prompt, user_prompt).await })
            .await
    }

    async fn chat_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(self.completions_url())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("LLM API error ({}): {}", status, error_text));
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow!("LLM返回内容为空"))
    }

    /// 流式对话：按SSE增量把片段发往`fragments`
    ///
    /// 片段一旦流出就已对用户可见，所以这里不做重试。
    async fn chat_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        fragments: &UnboundedSender<String>,
    ) -> Result<()> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": true,
        });

        let response = self
            .client
            .post(self.completions_url())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("LLM API error ({}): {}", status, error_text));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                let line = line.trim();
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    return Ok(());
                }
                if let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) {
                    if let Some(content) = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content)
                    {
                        if !content.is_empty() {
                            let _ = fragments.send(content);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl LLMProvider for LLMClient {
    async fn refine(&self, query: &str) -> Result<String> {
        let refined = self.chat(REFINE_SYSTEM_PROMPT, query).await?;
        Ok(refined.trim().to_string())
    }

    async fn filter(&self, query: &str, results: &[SearchResult]) -> Result<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let user_prompt = format!(
            "Investigation query: {}\n\nSearch results:\n{}",
            query,
            serde_json::to_string_pretty(results)?
        );
        let response = self.chat(FILTER_SYSTEM_PROMPT, &user_prompt).await?;
        let kept_urls = parse_url_array(&response)?;

        // 保持输入顺序，只保留模型点名的URL
        Ok(results
            .iter()
            .filter(|result| kept_urls.iter().any(|url| url == &result.url))
            .cloned()
            .collect())
    }

    async fn summarize(
        &self,
        query: &str,
        documents: &[ScrapedDocument],
        fragments: UnboundedSender<String>,
    ) -> Result<()> {
        let mut corpus = String::new();
        for document in documents {
            corpus.push_str(&format!(
                "## Source: {}\n\n{}\n\n",
                document.url, document.content
            ));
        }

        let user_prompt = format!(
            "Investigation query: {}\n\nScraped content:\n\n{}",
            query, corpus
        );
        self.chat_stream(SUMMARIZE_SYSTEM_PROMPT, &user_prompt, &fragments)
            .await
    }
}

/// 从模型回复中提取JSON数组形式的URL清单
fn parse_url_array(response: &str) -> Result<Vec<String>> {
    let start = response
        .find('[')
        .ok_or_else(|| anyhow!("过滤回复中没有JSON数组: {}", response))?;
    let end = response
        .rfind(']')
        .ok_or_else(|| anyhow!("过滤回复中JSON数组未闭合: {}", response))?;
    if end < start {
        return Err(anyhow!("过滤回复中JSON数组未闭合: {}", response));
    }
    let urls: Vec<String> = serde_json::from_str(&response[start..=end])
        .map_err(|e| anyhow!("解析过滤回复失败: {}", e))?;
    Ok(urls)
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_array_plain() {
        let urls =
            parse_url_array(r#"["http://a.onion/x", "http://b.onion/y"]"#).unwrap();
        assert_eq!(urls, vec!["http://a.onion/x", "http://b.onion/y"]);
    }

    #[test]
    fn test_parse_url_array_with_prose() {
        let response = "Here are the relevant results:\n```json\n[\"http://a.onion/x\"]\n```";
        let urls = parse_url_array(response).unwrap();
        assert_eq!(urls, vec!["http://a.onion/x"]);
    }

    #[test]
    fn test_parse_url_array_empty() {
        let urls = parse_url_array("[]").unwrap();
        assert!(urls.is_empty());
    }

    #[test]
    fn test_parse_url_array_invalid() {
        assert!(parse_url_array("no array here").is_err());
        assert!(parse_url_array("[unterminated").is_err());
    }

    #[test]
    fn test_parse_url_array_bracket_before_array() {
        // 回复中`]`先于`[`出现时必须返回错误而不是越界切片
        assert!(parse_url_array("keep: ] none of these [").is_err());
        assert!(parse_url_array("]").is_err());
    }

    #[test]
    fn test_completions_url_trims_trailing_slash() {
        let mut config = LLMConfig::default();
        config.api_base_url = "https://api.openai.com/v1/".to_string();
        let client = LLMClient::new(config).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
