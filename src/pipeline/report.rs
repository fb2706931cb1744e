use anyhow::Result;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// 最终产出的情报报告
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub filename: String,
    pub content: String,
    pub generated_at: DateTime<Local>,
}

/// 把最终总结文本物化为报告
///
/// 纯函数：文件名只由`now`决定，内容逐字等于`final_text`，
/// 不做任何转换或截断，便于注入时钟做精确复现测试。
pub fn materialize(final_text: &str, now: DateTime<Local>) -> Report {
    Report {
        filename: format!("intelligence_report_{}.md", now.format("%Y-%m-%d_%H-%M-%S")),
        content: final_text.to_string(),
        generated_at: now,
    }
}

/// 把报告写入输出目录，返回完整路径
pub fn save(report: &Report, output_dir: &Path) -> Result<PathBuf> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)?;
    }

    let path = output_dir.join(&report.filename);
    fs::write(&path, &report.content)?;

    Ok(path)
}
