use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Scheduled refresh interval in minutes; 0 disables the background loop
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    pub sources: Vec<SourceConfig>,
}

fn default_refresh_interval() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub feed_url: Option<String>,
    pub website_url: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_kind() -> String {
    "rss".to_string()
}

fn default_is_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Default number of unsummarized articles processed per refresh
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_batch_size() -> i64 {
    10
}

fn default_api_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            batch_size: default_batch_size(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_refresh_interval() {
        assert_eq!(default_refresh_interval(), 15);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            refresh_interval = 30

            [[sources]]
            name = "TechCrunch AI"
            slug = "techcrunch-ai"
            feed_url = "https://techcrunch.com/category/artificial-intelligence/feed/"
            website_url = "https://techcrunch.com/category/artificial-intelligence/"

            [[sources]]
            name = "Wired AI"
            slug = "wired-ai"
            feed_url = "https://www.wired.com/feed/tag/ai/latest/rss"
            website_url = "https://www.wired.com/tag/ai/"
            is_active = false
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.refresh_interval, 30);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].name, "TechCrunch AI");
        assert_eq!(config.sources[0].slug, "techcrunch-ai");
        assert!(config.sources[0].is_active);
        assert_eq!(config.sources[1].slug, "wired-ai");
        assert!(!config.sources[1].is_active);
    }

    #[test]
    fn test_source_defaults() {
        let content = r#"
            [[sources]]
            name = "Test Source"
            slug = "test-source"
            website_url = "https://example.com"
        "#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.refresh_interval, 15); // Default value
        assert_eq!(config.sources[0].kind, "rss");
        assert!(config.sources[0].is_active);
        assert!(config.sources[0].feed_url.is_none());
    }

    #[test]
    fn test_summarizer_defaults() {
        let content = r#"
            [[sources]]
            name = "Test Source"
            slug = "test-source"
            website_url = "https://example.com"
        "#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.summarizer.model, "claude-haiku-4-5-20251001");
        assert_eq!(config.summarizer.max_tokens, 300);
        assert_eq!(config.summarizer.batch_size, 10);
        assert_eq!(config.summarizer.api_base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_summarizer_overrides() {
        let content = r#"
            sources = []

            [summarizer]
            model = "claude-sonnet-4-20250514"
            max_tokens = 512
            batch_size = 5
        "#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.summarizer.model, "claude-sonnet-4-20250514");
        assert_eq!(config.summarizer.max_tokens, 512);
        assert_eq!(config.summarizer.batch_size, 5);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_required_fields() {
        let content = r#"
            [[sources]]
            name = "Test Source"
            # Missing slug and website_url
        "#;

        let result = Config::from_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_sources_list() {
        let content = "sources = []";

        let config = Config::from_str(content).unwrap();
        assert!(config.sources.is_empty());
    }
}
