use std::sync::Arc;

use anyhow::Result;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::providers::{
    ConsoleSink, LLMClient, LLMProvider, OnionSearch, PresentationSink, ScrapeProvider, Scraper,
    SearchProvider,
};

/// 调查流水线上下文
///
/// 缓存是进程级的，跨运行共享；各协作方以trait对象注入，测试时可替换。
#[derive(Clone)]
pub struct PipelineContext {
    /// 配置
    pub config: Config,
    /// 进程级缓存
    pub cache: Arc<CacheStore>,
    /// LLM协作方
    pub llm: Arc<dyn LLMProvider>,
    /// 搜索协作方
    pub search: Arc<dyn SearchProvider>,
    /// 抓取协作方
    pub scrape: Arc<dyn ScrapeProvider>,
    /// 展示层观察者
    pub sink: Arc<dyn PresentationSink>,
}

impl PipelineContext {
    /// 用生产环境协作方创建上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm = Arc::new(LLMClient::new(config.llm.clone())?);
        let search = Arc::new(OnionSearch::new(config.search.clone())?);
        let scrape = Arc::new(Scraper::new(config.scrape.clone())?);
        Ok(Self::with_providers(
            config,
            llm,
            search,
            scrape,
            Arc::new(ConsoleSink::default()),
        ))
    }

    /// 注入自定义协作方（测试用）
    pub fn with_providers(
        config: Config,
        llm: Arc<dyn LLMProvider>,
        search: Arc<dyn SearchProvider>,
        scrape: Arc<dyn ScrapeProvider>,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        let cache = Arc::new(CacheStore::new(config.cache.clone()));
        Self {
            config,
            cache,
            llm,
            search,
            scrape,
            sink,
        }
    }
}
