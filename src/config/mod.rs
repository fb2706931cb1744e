use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// 流水线允许的最大并发数
pub const MAX_THREADS: usize = 16;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProviderKind {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProviderKind::OpenAI => write!(f, "openai"),
            LLMProviderKind::OpenRouter => write!(f, "openrouter"),
            LLMProviderKind::DeepSeek => write!(f, "deepseek"),
            LLMProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProviderKind::OpenAI),
            "openrouter" => Ok(LLMProviderKind::OpenRouter),
            "deepseek" => Ok(LLMProviderKind::DeepSeek),
            "ollama" => Ok(LLMProviderKind::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl LLMProviderKind {
    /// 各Provider的OpenAI兼容API基地址
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProviderKind::OpenAI => "https://api.openai.com/v1",
            LLMProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            LLMProviderKind::DeepSeek => "https://api.deepseek.com/v1",
            LLMProviderKind::Ollama => "http://localhost:11434/v1",
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// 情报报告输出目录
    pub output_path: PathBuf,

    /// 搜索与抓取阶段的并发数（1-16）
    pub threads: usize,

    /// 是否启用详细日志
    pub verbose: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 搜索后端配置
    pub search: SearchConfig,

    /// 抓取后端配置
    pub scrape: ScrapeConfig,

    /// 缓存配置
    pub cache: CacheConfig,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProviderKind,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 搜索后端配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// 搜索端点模板，`{query}`占位符会被替换为编码后的查询
    pub endpoints: Vec<String>,

    /// 单次调查保留的最大搜索结果数
    pub max_results: usize,

    /// 单个端点请求的超时时间（秒）
    pub timeout_seconds: u64,
}

/// 抓取后端配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScrapeConfig {
    /// 代理地址（如Tor的socks5h://127.0.0.1:9050），为空则直连
    pub proxy: Option<String>,

    /// 单个页面抓取的超时时间（秒）
    pub timeout_seconds: u64,

    /// 单个页面保留的最大正文长度（字符）
    pub max_content_length: usize,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存有效期（秒）
    pub ttl_seconds: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 将并发数限制在合法区间内，超出时给出警告
    pub fn clamp_threads(&mut self) {
        if self.threads < 1 || self.threads > MAX_THREADS {
            eprintln!(
                "⚠️ 警告: 并发数 {} 超出范围 [1, {}]，已自动修正",
                self.threads, MAX_THREADS
            );
            self.threads = self.threads.clamp(1, MAX_THREADS);
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./reports"),
            threads: 4,
            verbose: false,
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            scrape: ScrapeConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProviderKind::default(),
            api_key: std::env::var("DARKSCOPE_LLM_API_KEY").unwrap_or_default(),
            api_base_url: LLMProviderKind::default().default_base_url().to_string(),
            model: String::from("gpt-4o"),
            max_tokens: 8192,
            temperature: 0.1,
            retry_attempts: 5,
            retry_delay_ms: 5000,
            timeout_seconds: 300,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![String::from("https://ahmia.fi/search/?q={query}")],
            max_results: 40,
            timeout_seconds: 30,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            proxy: Some(String::from("socks5h://127.0.0.1:9050")),
            timeout_seconds: 60,
            max_content_length: 20000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 200,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
