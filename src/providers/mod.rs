//! 外部协作方接口 - 搜索、抓取、LLM与展示层

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;

pub mod llm;
pub mod scrape;
pub mod search;
pub mod sink;

pub use llm::LLMClient;
pub use scrape::Scraper;
pub use search::OnionSearch;
pub use sink::ConsoleSink;

use crate::pipeline::investigation::{Stage, StageStatus};

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// 单个已抓取页面
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedDocument {
    pub url: String,
    pub content: String,
}

/// LLM协作方：查询精炼、结果过滤与流式总结
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// 把自由文本查询精炼为更适合暗网索引的检索式
    async fn refine(&self, query: &str) -> Result<String>;

    /// 依据查询意图筛选候选结果，返回保留的子集
    async fn filter(&self, query: &str, results: &[SearchResult]) -> Result<Vec<SearchResult>>;

    /// 流式生成情报总结，按产出顺序把片段发往`fragments`
    ///
    /// 聚合后的缓冲区是最终文本的规范来源，因此这里不返回字符串。
    async fn summarize(
        &self,
        query: &str,
        documents: &[ScrapedDocument],
        fragments: UnboundedSender<String>,
    ) -> Result<()>;
}

/// 搜索协作方
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// 执行搜索，内部按`concurrency`并发扇出子请求
    async fn search(&self, query: &str, concurrency: usize) -> Result<Vec<SearchResult>>;
}

/// 抓取协作方，由执行器按条目逐个调用
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ScrapedDocument>;
}

/// 展示层观察者 - 只读快照，绝不改写核心状态
///
/// 所有方法都有空默认实现，展示实现按需覆盖。
pub trait PresentationSink: Send + Sync {
    fn on_stage_status(&self, _stage: Stage, _status: StageStatus) {}

    fn on_query_refined(&self, _refined: &str) {}

    fn on_search_completed(&self, _count: usize) {}

    fn on_filter_completed(&self, _kept: usize, _total: usize) {}

    fn on_scrape_completed(&self, _fetched: usize, _failed: usize) {}

    /// 每收到一个片段就推送一次完整缓冲区快照
    fn on_summary_snapshot(&self, _buffer: &str) {}

    fn on_report_saved(&self, _path: &Path) {}
}
