//! 页面抓取 - 经Tor代理逐页获取并清洗正文

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

use crate::config::ScrapeConfig;
use crate::providers::{ScrapeProvider, ScrapedDocument};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) darkscope/0.3";

/// 页面抓取客户端
pub struct Scraper {
    config: ScrapeConfig,
    client: reqwest::Client,
    noise_re: Regex,
    tag_re: Regex,
}

impl Scraper {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT);

        // .onion站点要求经Tor的socks代理访问
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        let client = builder.build()?;
        let noise_re = Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")?;
        let tag_re = Regex::new(r"<[^>]+>")?;

        Ok(Self {
            config,
            client,
            noise_re,
            tag_re,
        })
    }

    /// 把HTML清洗为截断后的纯文本正文
    fn clean_html(&self, html: &str) -> String {
        let without_noise = self.noise_re.replace_all(html, " ");
        let without_tags = self.tag_re.replace_all(&without_noise, " ");
        let decoded = without_tags
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&nbsp;", " ");

        let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed
            .chars()
            .take(self.config.max_content_length)
            .collect()
    }
}

#[async_trait]
impl ScrapeProvider for Scraper {
    async fn fetch(&self, url: &str) -> Result<ScrapedDocument> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("抓取 {} 失败: {}", url, response.status()));
        }

        let html = response.text().await?;
        let content = self.clean_html(&html);
        if content.is_empty() {
            return Err(anyhow!("抓取 {} 得到空正文", url));
        }

        Ok(ScrapedDocument {
            url: url.to_string(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper_with_limit(max_content_length: usize) -> Scraper {
        Scraper::new(ScrapeConfig {
            proxy: None,
            timeout_seconds: 5,
            max_content_length,
        })
        .unwrap()
    }

    #[test]
    fn test_clean_html_strips_noise_and_tags() {
        let scraper = scraper_with_limit(20000);
        let html = r#"
            <html><head><style>body { color: red; }</style></head>
            <body>
                <script>alert("tracker");</script>
                <h1>Leaked&nbsp;Credentials</h1>
                <p>Fresh dump &amp; combo list.</p>
            </body></html>
        "#;

        let content = scraper.clean_html(html);
        assert_eq!(content, "Leaked Credentials Fresh dump & combo list.");
        assert!(!content.contains("alert"));
        assert!(!content.contains("color"));
    }

    #[test]
    fn test_clean_html_truncates_to_limit() {
        let scraper = scraper_with_limit(10);
        let html = "<p>0123456789 overflowing content</p>";
        let content = scraper.clean_html(html);
        assert_eq!(content.chars().count(), 10);
    }

    #[test]
    fn test_proxy_configuration_accepted() {
        let scraper = Scraper::new(ScrapeConfig {
            proxy: Some("socks5h://127.0.0.1:9050".to_string()),
            timeout_seconds: 5,
            max_content_length: 100,
        });
        assert!(scraper.is_ok());
    }
}
