//! 暗网索引搜索 - 多端点并发扇出

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::executor;
use crate::providers::{SearchProvider, SearchResult};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) darkscope/0.3";

/// 暗网索引搜索客户端
///
/// 对每个配置的端点发一次请求，端点间按并发数扇出；
/// 部分端点失败不致命，全部失败才算搜索失败。
pub struct OnionSearch {
    config: SearchConfig,
    client: reqwest::Client,
    anchor_re: Regex,
    tag_re: Regex,
}

impl OnionSearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()?;

        // 锚点链接 + 可选的紧随其后的描述段落
        let anchor_re = Regex::new(
            r#"(?s)<a[^>]+href="(https?://[^"]+)"[^>]*>(.*?)</a>\s*(?:<p[^>]*>(.*?)</p>)?"#,
        )?;
        let tag_re = Regex::new(r"<[^>]+>")?;

        Ok(Self {
            config,
            client,
            anchor_re,
            tag_re,
        })
    }

    /// 空白折叠为`+`，与索引引擎的查询串约定一致
    fn encode_query(query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join("+")
    }

    fn strip_tags(&self, html: &str) -> String {
        let text = self.tag_re.replace_all(html, " ");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 从结果页HTML中提取搜索结果
    fn extract_results(&self, html: &str) -> Vec<SearchResult> {
        let mut results = Vec::new();
        for capture in self.anchor_re.captures_iter(html) {
            let url = capture[1].trim().to_string();
            let title = self.strip_tags(&capture[2]);
            if title.is_empty() {
                continue;
            }
            let snippet = capture
                .get(3)
                .map(|m| self.strip_tags(m.as_str()))
                .unwrap_or_default();
            results.push(SearchResult {
                url,
                title,
                snippet,
            });
        }
        results
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<SearchResult>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("搜索端点返回 {}: {}", response.status(), url));
        }
        let html = response.text().await?;
        Ok(self.extract_results(&html))
    }
}

#[async_trait]
impl SearchProvider for OnionSearch {
    async fn search(&self, query: &str, concurrency: usize) -> Result<Vec<SearchResult>> {
        let encoded = Self::encode_query(query);
        let requests: Vec<String> = self
            .config
            .endpoints
            .iter()
            .map(|template| template.replace("{query}", &encoded))
            .collect();
        let total = requests.len();

        let outcome = executor::run_all(requests, concurrency, |url| async move {
            self.fetch_page(&url).await
        })
        .await;

        if outcome.all_failed() {
            return Err(anyhow!("全部 {} 个搜索端点请求失败", total));
        }

        // 跨端点按URL去重，保持首次出现的顺序
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for page in outcome.successes() {
            for result in page {
                if seen.insert(result.url.clone()) {
                    results.push(result);
                    if results.len() >= self.config.max_results {
                        return Ok(results);
                    }
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_client() -> OnionSearch {
        OnionSearch::new(SearchConfig::default()).unwrap()
    }

    #[test]
    fn test_encode_query_folds_whitespace() {
        assert_eq!(
            OnionSearch::encode_query("ransomware  payment\ttracking"),
            "ransomware+payment+tracking"
        );
        assert_eq!(OnionSearch::encode_query("single"), "single");
    }

    #[test]
    fn test_extract_results_with_snippets() {
        let html = r#"
            <li class="result">
                <a href="http://alpha.onion/market"><b>Alpha</b> Market</a>
                <p>Largest <i>marketplace</i> listing.</p>
            </li>
            <li class="result">
                <a href="http://beta.onion/forum">Beta Forum</a>
            </li>
        "#;

        let results = search_client().extract_results(html);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "http://alpha.onion/market");
        assert_eq!(results[0].title, "Alpha Market");
        assert_eq!(results[0].snippet, "Largest marketplace listing.");
        assert_eq!(results[1].title, "Beta Forum");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn test_extract_results_skips_empty_titles() {
        let html = r#"<a href="http://icon.onion/x"><img src="icon.png"/></a>"#;
        let results = search_client().extract_results(html);
        assert!(results.is_empty());
    }
}
