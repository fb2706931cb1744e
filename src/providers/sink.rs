//! 终端展示层 - 以状态行与增量输出呈现调查进展

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::pipeline::investigation::{Stage, StageStatus};
use crate::providers::PresentationSink;

/// 终端观察者
///
/// 只读消费编排器推送的快照；总结片段以增量方式写到stdout。
#[derive(Default)]
pub struct ConsoleSink {
    /// 总结缓冲区中已输出到终端的长度（字节）
    printed: Mutex<usize>,
}

impl ConsoleSink {
    fn running_banner(stage: Stage) -> &'static str {
        match stage {
            Stage::Refine => "🔄 正在精炼查询...",
            Stage::Search => "🔍 正在搜索暗网...",
            Stage::Filter => "🗂️ 正在过滤结果...",
            Stage::Scrape => "📜 正在抓取内容...",
            Stage::Summarize => "✍️ 正在生成总结...",
        }
    }
}

impl PresentationSink for ConsoleSink {
    fn on_stage_status(&self, stage: Stage, status: StageStatus) {
        match status {
            StageStatus::Running => {
                // 新一轮总结的缓冲区从头开始，增量偏移必须归零
                if stage == Stage::Summarize {
                    *self.printed.lock().unwrap() = 0;
                }
                println!("{}", Self::running_banner(stage));
            }
            StageStatus::Failed => eprintln!("❌ 阶段 {} 失败", stage),
            StageStatus::Pending | StageStatus::Done => {}
        }
    }

    fn on_query_refined(&self, refined: &str) {
        println!("✅ 精炼后的检索式: {}", refined);
    }

    fn on_search_completed(&self, count: usize) {
        println!("✅ 搜索完成，共 {} 条结果", count);
    }

    fn on_filter_completed(&self, kept: usize, total: usize) {
        println!("✅ 过滤完成，保留 {} / {} 条结果", kept, total);
    }

    fn on_scrape_completed(&self, fetched: usize, failed: usize) {
        if failed > 0 {
            println!("⚠️ 抓取完成，成功 {} 个页面，失败 {} 个", fetched, failed);
        } else {
            println!("✅ 抓取完成，共 {} 个页面", fetched);
        }
    }

    fn on_summary_snapshot(&self, buffer: &str) {
        // 快照是全量缓冲区，只把新增的尾部写到终端
        let mut printed = self.printed.lock().unwrap();
        if buffer.len() > *printed {
            print!("{}", &buffer[*printed..]);
            let _ = std::io::stdout().flush();
            *printed = buffer.len();
        }
    }

    fn on_report_saved(&self, path: &Path) {
        println!("\n💾 情报报告已保存: {}", path.display());
    }
}
