use crate::config::{Config, LLMProviderKind};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// darkscope - 由Rust与AI驱动的暗网OSINT调查引擎
#[derive(Parser, Debug)]
#[command(name = "darkscope")]
#[command(
    about = "AI-powered dark web OSINT investigation engine. It refines a query, searches dark web indexes, filters and scrapes the surviving results, and streams a synthesized intelligence report."
)]
#[command(version)]
pub struct Args {
    /// 调查查询
    pub query: String,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 报告输出目录
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 搜索与抓取阶段的并发数 (1-16)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// 模型名称
    #[arg(short, long)]
    pub model: Option<String>,

    /// LLM Provider (openai, openrouter, deepseek, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// 抓取代理地址（如 socks5h://127.0.0.1:9050）
    #[arg(long)]
    pub proxy: Option<String>,

    /// 缓存有效期（秒）
    #[arg(long)]
    pub ttl_seconds: Option<u64>,

    /// 是否禁用缓存
    #[arg(long)]
    pub no_cache: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数合并为配置与查询
    ///
    /// 优先级：CLI参数 > 配置文件 > 默认值。
    pub fn into_config(self) -> Result<(Config, String)> {
        // 默认从当前目录探测配置文件
        let default_config_path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("darkscope.toml");
        self.into_config_with_default(Some(default_config_path))
    }

    /// 同`into_config`，但默认配置文件的探测位置可注入
    fn into_config_with_default(
        self,
        default_config_path: Option<PathBuf>,
    ) -> Result<(Config, String)> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可读
            Config::from_file(config_path)
                .context(format!("无法读取配置文件 {:?}", config_path))?
        } else if let Some(default_path) = default_config_path.filter(|path| path.exists()) {
            Config::from_file(&default_path)
                .context(format!("无法读取默认配置文件 {:?}", default_path))?
        } else {
            Config::default()
        };

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            match provider_str.parse::<LLMProviderKind>() {
                Ok(provider) => {
                    // 切换provider时若未显式给出基地址，跟随provider的默认值
                    if self.llm_api_base_url.is_none() {
                        config.llm.api_base_url = provider.default_base_url().to_string();
                    }
                    config.llm.provider = provider;
                }
                Err(_) => {
                    eprintln!(
                        "⚠️ 警告: 未知的provider: {}，使用默认provider",
                        provider_str
                    );
                }
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }

        // 覆盖流水线配置
        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(proxy) = self.proxy {
            config.scrape.proxy = Some(proxy);
        }

        // 缓存配置
        if let Some(ttl_seconds) = self.ttl_seconds {
            config.cache.ttl_seconds = ttl_seconds;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }

        config.verbose = self.verbose;
        config.clamp_threads();

        Ok((config, self.query))
    }
}
