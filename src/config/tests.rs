#[cfg(test)]
mod tests {
    use crate::config::{Config, LLMProviderKind, MAX_THREADS};
    use std::str::FromStr;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.threads, 4);
        assert!(!config.verbose);
        assert_eq!(config.output_path, std::path::PathBuf::from("./reports"));
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_seconds, 200);
        assert_eq!(config.search.max_results, 40);
        assert_eq!(config.scrape.max_content_length, 20000);
    }

    #[test]
    fn test_default_llm_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, LLMProviderKind::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.temperature, 0.1);
        assert_eq!(config.llm.retry_attempts, 5);
        assert!(!config.llm.api_base_url.is_empty());
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!(
            LLMProviderKind::from_str("openai").unwrap(),
            LLMProviderKind::OpenAI
        );
        assert_eq!(
            LLMProviderKind::from_str("OpenRouter").unwrap(),
            LLMProviderKind::OpenRouter
        );
        assert_eq!(
            LLMProviderKind::from_str("deepseek").unwrap(),
            LLMProviderKind::DeepSeek
        );
        assert_eq!(
            LLMProviderKind::from_str("ollama").unwrap(),
            LLMProviderKind::Ollama
        );
        assert!(LLMProviderKind::from_str("unknown").is_err());
    }

    #[test]
    fn test_provider_kind_display_roundtrip() {
        for kind in [
            LLMProviderKind::OpenAI,
            LLMProviderKind::OpenRouter,
            LLMProviderKind::DeepSeek,
            LLMProviderKind::Ollama,
        ] {
            let parsed = LLMProviderKind::from_str(&kind.to_string()).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_provider_base_urls() {
        assert!(
            LLMProviderKind::Ollama
                .default_base_url()
                .starts_with("http://localhost")
        );
        assert!(
            LLMProviderKind::OpenAI
                .default_base_url()
                .starts_with("https://")
        );
    }

    #[test]
    fn test_clamp_threads() {
        let mut config = Config::default();
        config.threads = 0;
        config.clamp_threads();
        assert_eq!(config.threads, 1);

        config.threads = 99;
        config.clamp_threads();
        assert_eq!(config.threads, MAX_THREADS);

        config.threads = 8;
        config.clamp_threads();
        assert_eq!(config.threads, 8);
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("darkscope.toml");

        let content = r#"
output_path = "./intel"
threads = 8
verbose = true

[llm]
provider = "deepseek"
api_key = "test-key"
api_base_url = "https://api.deepseek.com/v1"
model = "deepseek-chat"
max_tokens = 4096
temperature = 0.2
retry_attempts = 3
retry_delay_ms = 1000
timeout_seconds = 120

[search]
endpoints = ["https://example.onion/search?q={query}"]
max_results = 10
timeout_seconds = 15

[scrape]
timeout_seconds = 30
max_content_length = 5000

[cache]
enabled = false
ttl_seconds = 60
"#;
        std::fs::write(&config_path, content).unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.threads, 8);
        assert!(config.verbose);
        assert_eq!(config.llm.provider, LLMProviderKind::DeepSeek);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.search.endpoints.len(), 1);
        assert!(config.scrape.proxy.is_none());
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl_seconds, 60);
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file(&std::path::PathBuf::from("/nonexistent/darkscope.toml"));
        assert!(result.is_err());
    }
}
