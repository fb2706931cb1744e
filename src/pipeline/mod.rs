use anyhow::{Result, anyhow};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::cache::{self, CacheKey};
use crate::config::Config;
use crate::executor;
use crate::providers::{ScrapeProvider, ScrapedDocument};

pub mod context;
pub mod investigation;
pub mod report;
pub mod stream;

pub use context::PipelineContext;
pub use investigation::{Investigation, Stage, StageStatus};
pub use report::Report;
pub use stream::StreamAggregator;

/// 阶段失败：记录失败的阶段与底层原因
///
/// 某阶段失败即终止本次运行，之后的阶段不再执行。
#[derive(Debug, Error)]
#[error("阶段 {stage} 执行失败: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

/// 启动一次完整调查并把报告落盘
pub async fn launch(config: &Config, query: &str) -> Result<()> {
    let context = PipelineContext::new(config.clone())?;
    let sink = context.sink.clone();
    let cache = context.cache.clone();

    let mut engine = Engine::new(context);
    let report = engine.run(query).await?;

    let path = report::save(&report, &config.output_path)?;
    sink.on_report_saved(&path);

    if config.verbose {
        let stats = cache.stats();
        println!(
            "📊 缓存统计: 命中 {} / 未命中 {} / 写入 {}",
            stats.hits, stats.misses, stats.writes
        );
    }

    Ok(())
}

/// 调查流水线编排器
///
/// 五个阶段严格顺序执行，进入阶段N要求阶段N-1为Done；
/// `run(&mut self)`保证同一时刻只有一次运行在进行，
/// 上一轮的聚合器在新运行开始前必然已经finalize。
pub struct Engine {
    context: PipelineContext,
    investigation: Investigation,
}

impl Engine {
    pub fn new(context: PipelineContext) -> Self {
        Self {
            investigation: Investigation::new(""),
            context,
        }
    }

    /// 当前调查记录的只读快照
    pub fn investigation(&self) -> &Investigation {
        &self.investigation
    }

    /// 执行一次完整调查
    ///
    /// 失败时调查记录停留在最后一个成功阶段的状态；
    /// 总结中途失败时，已流出的部分缓冲区仍保留在`summary_text`中。
    pub async fn run(&mut self, query: &str) -> Result<Report, StageError> {
        // 新运行无条件重置：全新记录，所有阶段Pending，所有字段为空
        self.investigation = Investigation::new(query);

        let threads = self.context.config.threads;
        let ttl = self.context.cache.default_ttl();

        // 阶段1：精炼查询（不缓存，模型状态每次可能不同）
        let refined = {
            let llm = self.context.llm.clone();
            let q = query.to_string();
            self.execute(Stage::Refine, async move { llm.refine(&q).await })
                .await?
        };
        self.context.sink.on_query_refined(&refined);
        self.investigation.refined_query = Some(refined.clone());

        // 阶段2：搜索，按(阶段, 查询指纹, 并发数)缓存
        let results = {
            let cache = self.context.cache.clone();
            let search = self.context.search.clone();
            let key = CacheKey::new("search", cache::fingerprint(&refined), threads);
            let q = refined.clone();
            self.execute(Stage::Search, async move {
                cache
                    .get_or_compute(key, ttl, || async move { search.search(&q, threads).await })
                    .await
            })
            .await?
        };
        self.context.sink.on_search_completed(results.len());
        self.investigation.search_results = Some(results.clone());

        // 阶段3：过滤（不缓存，依赖模型即时判断）
        let filtered = {
            let llm = self.context.llm.clone();
            let q = refined.clone();
            let candidates = results.clone();
            self.execute(Stage::Filter, async move { llm.filter(&q, &candidates).await })
                .await?
        };
        self.context
            .sink
            .on_filter_completed(filtered.len(), results.len());
        self.investigation.filtered_results = Some(filtered.clone());

        // 阶段4：抓取，按(阶段, 结果集指纹, 并发数)缓存
        let documents = {
            let cache = self.context.cache.clone();
            let scrape = self.context.scrape.clone();
            let urls: Vec<String> = filtered.iter().map(|r| r.url.clone()).collect();
            let fingerprint_input = serde_json::to_string(&urls).unwrap_or_default();
            let key = CacheKey::new("scrape", cache::fingerprint(&fingerprint_input), threads);
            self.execute(Stage::Scrape, async move {
                cache
                    .get_or_compute(key, ttl, || async move {
                        scrape_batch(scrape, urls, threads).await
                    })
                    .await
            })
            .await?
        };
        self.context
            .sink
            .on_scrape_completed(documents.len(), filtered.len().saturating_sub(documents.len()));
        self.investigation.scraped_documents = Some(documents.clone());

        // 阶段5：流式总结，片段经spsc通道进入聚合器
        // 原始查询（而非精炼式）作为总结的提问
        let summarize_result = {
            let llm = self.context.llm.clone();
            let q = self.investigation.original_query.clone();
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();
            let mut aggregator = StreamAggregator::new(self.context.sink.clone());

            self.set_status(Stage::Summarize, StageStatus::Running);

            let producer = async move { llm.summarize(&q, &documents, tx).await };
            let consumer = async move {
                while let Some(fragment) = rx.recv().await {
                    aggregator.on_fragment(&fragment);
                }
                aggregator
            };
            let (result, aggregator) = tokio::join!(producer, consumer);

            // 失败也保留部分缓冲区，用户仍可查看已产出的情报
            self.investigation.summary_text = aggregator.finalize();
            result
        };

        match summarize_result {
            Ok(()) => self.set_status(Stage::Summarize, StageStatus::Done),
            Err(source) => {
                self.set_status(Stage::Summarize, StageStatus::Failed);
                return Err(StageError {
                    stage: Stage::Summarize,
                    source,
                });
            }
        }

        Ok(report::materialize(
            &self.investigation.summary_text,
            chrono::Local::now(),
        ))
    }

    /// 执行单个阶段并维护其状态机
    async fn execute<T, Fut>(&mut self, stage: Stage, fut: Fut) -> Result<T, StageError>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.set_status(stage, StageStatus::Running);
        match fut.await {
            Ok(value) => {
                self.set_status(stage, StageStatus::Done);
                Ok(value)
            }
            Err(source) => {
                self.set_status(stage, StageStatus::Failed);
                Err(StageError { stage, source })
            }
        }
    }

    fn set_status(&mut self, stage: Stage, status: StageStatus) {
        self.investigation.set_status(stage, status);
        self.context.sink.on_stage_status(stage, status);
    }
}

/// 为幸存结果逐条抓取页面，部分失败不致命，非空批次全部失败才算阶段失败
async fn scrape_batch(
    scrape: Arc<dyn ScrapeProvider>,
    urls: Vec<String>,
    concurrency: usize,
) -> Result<Vec<ScrapedDocument>> {
    if urls.is_empty() {
        return Ok(Vec::new());
    }

    let total = urls.len();
    let outcome = executor::run_all(urls, concurrency, |url| {
        let scrape = scrape.clone();
        async move { scrape.fetch(&url).await }
    })
    .await;

    if outcome.all_failed() {
        return Err(anyhow!("全部 {} 个页面抓取失败", total));
    }

    Ok(outcome.successes())
}
