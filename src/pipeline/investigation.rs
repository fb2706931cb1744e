use serde::{Deserialize, Serialize};

use crate::providers::{ScrapedDocument, SearchResult};

/// 调查流水线的五个阶段，严格按声明顺序执行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Refine,
    Search,
    Filter,
    Scrape,
    Summarize,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Refine,
        Stage::Search,
        Stage::Filter,
        Stage::Scrape,
        Stage::Summarize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Refine => "refine",
            Stage::Search => "search",
            Stage::Filter => "filter",
            Stage::Scrape => "scrape",
            Stage::Summarize => "summarize",
        }
    }

    fn index(&self) -> usize {
        match self {
            Stage::Refine => 0,
            Stage::Search => 1,
            Stage::Filter => 2,
            Stage::Scrape => 3,
            Stage::Summarize => 4,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 阶段状态机：Pending -> Running -> Done | Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

/// 一次调查运行的全部状态
///
/// 每次新运行创建全新记录，由编排器独占持有，上一轮的任何字段都不会泄漏。
/// 阶段N的字段只在阶段N-1为Done之后被填充；某阶段Failed后，
/// 其后的字段保持未设置。
#[derive(Debug, Clone)]
pub struct Investigation {
    pub original_query: String,
    pub refined_query: Option<String>,
    pub search_results: Option<Vec<SearchResult>>,
    pub filtered_results: Option<Vec<SearchResult>>,
    pub scraped_documents: Option<Vec<ScrapedDocument>>,
    /// 只由流式聚合器增长的总结缓冲区
    pub summary_text: String,
    statuses: [StageStatus; 5],
}

impl Investigation {
    /// 创建全新的调查记录，所有阶段为Pending，所有字段为空
    pub fn new(query: &str) -> Self {
        Self {
            original_query: query.to_string(),
            refined_query: None,
            search_results: None,
            filtered_results: None,
            scraped_documents: None,
            summary_text: String::new(),
            statuses: [StageStatus::Pending; 5],
        }
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.statuses[stage.index()]
    }

    pub(crate) fn set_status(&mut self, stage: Stage, status: StageStatus) {
        self.statuses[stage.index()] = status;
    }
}
