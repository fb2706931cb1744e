use anyhow::Result;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::MAX_THREADS;

/// 批次中单项的失败记录
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub error: anyhow::Error,
}

/// 受限并发批次的执行结果
///
/// `results[i]`对应`items[i]`，与完成顺序无关；失败项为`None`，
/// 其错误连同下标收集在`failures`中，由调用方决定整批是否算失败。
#[derive(Debug)]
pub struct BatchOutcome<O> {
    pub results: Vec<Option<O>>,
    pub failures: Vec<BatchFailure>,
}

impl<O> BatchOutcome<O> {
    /// 按输入顺序取出所有成功项
    pub fn successes(self) -> Vec<O> {
        self.results.into_iter().flatten().collect()
    }

    /// 非空批次是否全部失败
    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(Option::is_none)
    }
}

/// 以受限并发执行一批相互独立的任务
///
/// 并发数被限制在[1, 16]。单项失败不会中断批次，其余任务继续执行。
pub async fn run_all<I, O, F, Fut>(items: Vec<I>, concurrency: usize, worker: F) -> BatchOutcome<O>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O>>,
{
    let concurrency = concurrency.clamp(1, MAX_THREADS);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let bounded: Vec<_> = items
        .into_iter()
        .map(|item| {
            let semaphore = semaphore.clone();
            let fut = worker(item);
            async move {
                // 信号量在整个进程中不会被关闭
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                fut.await
            }
        })
        .collect();

    // join_all保持输入顺序，与各任务的完成顺序无关
    let outputs = join_all(bounded).await;

    let mut results = Vec::with_capacity(outputs.len());
    let mut failures = Vec::new();
    for (index, output) in outputs.into_iter().enumerate() {
        match output {
            Ok(value) => results.push(Some(value)),
            Err(error) => {
                results.push(None);
                failures.push(BatchFailure { index, error });
            }
        }
    }

    BatchOutcome { results, failures }
}
