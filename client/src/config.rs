use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_TOKEN_FILE: &str = ".blog-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin, without a trailing slash
    pub base_url: String,
    /// Where a remembered token is kept between runs
    pub token_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_file: std::env::temp_dir().join(DEFAULT_TOKEN_FILE),
        }
    }
}

impl ClientConfig {
    /// Reads `BLOG_API_URL` and `BLOG_TOKEN_FILE`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            base_url: var("BLOG_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            token_file: var("BLOG_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_api() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config.base_url, "http://localhost:5000");
        assert!(config.token_file.ends_with(".blog-token"));
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(|key: &str| match key {
            "BLOG_API_URL" => Some("https://blog.example.com/".to_string()),
            "BLOG_TOKEN_FILE" => Some("/tmp/token".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://blog.example.com");
        assert_eq!(config.token_file, PathBuf::from("/tmp/token"));
    }
}
