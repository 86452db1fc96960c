//! Link rewriting collaborator.
//!
//! The channel manager treats rewriting as an opaque, possibly slow service
//! behind [`LinkRewriter`]. [`LinkCleaner`] is the built-in implementation:
//! it normalizes a link, drops tracking parameters and the fragment.

use async_trait::async_trait;
use oxiguard_core::config::LinksConfig;
use oxiguard_core::ErrorKind;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::InvalidUrl { .. } => ErrorKind::InvalidInput,
        }
    }
}

/// Rewrites a user-supplied link into the form the bot repeats.
#[async_trait]
pub trait LinkRewriter: Send + Sync {
    async fn rewrite(&self, link: &str) -> Result<String, LinkError>;
}

/// Strips tracking parameters and fragments from http(s) links.
#[derive(Clone, Debug)]
pub struct LinkCleaner {
    strip_params: Vec<String>,
    allowed_schemes: Vec<String>,
}

impl LinkCleaner {
    pub fn new(config: &LinksConfig) -> Self {
        Self {
            strip_params: config.strip_params.clone(),
            allowed_schemes: config
                .allowed_schemes
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    fn is_stripped(&self, param: &str) -> bool {
        self.strip_params.iter().any(|p| match p.strip_suffix('*') {
            Some(prefix) => param.starts_with(prefix),
            None => param == p,
        })
    }

    /// Synchronous core of [`LinkRewriter::rewrite`].
    pub fn clean(&self, link: &str) -> Result<String, LinkError> {
        let trimmed = link.trim();
        let invalid = |reason: &str| LinkError::InvalidUrl {
            url: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty link"));
        }

        // Bare domains ("example.com/path") are assumed to be https
        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let mut url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
        if !self.allowed_schemes.iter().any(|s| s == url.scheme()) {
            return Err(invalid(&format!("scheme '{}' not allowed", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !self.is_stripped(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        url.set_fragment(None);

        Ok(url.to_string())
    }
}

impl Default for LinkCleaner {
    fn default() -> Self {
        Self::new(&LinksConfig::default())
    }
}

#[async_trait]
impl LinkRewriter for LinkCleaner {
    async fn rewrite(&self, link: &str) -> Result<String, LinkError> {
        self.clean(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tracking_and_fragment() {
        let cleaner = LinkCleaner::default();
        let out = cleaner
            .clean("https://youtube.com/watch?v=abc&utm_source=chat&fbclid=1#t=10")
            .unwrap();
        assert_eq!(out, "https://youtube.com/watch?v=abc");
    }

    #[test]
    fn test_bare_domain_gets_https() {
        let cleaner = LinkCleaner::default();
        assert_eq!(cleaner.clean("example.com").unwrap(), "https://example.com/");
        assert_eq!(
            cleaner.clean("  example.com/a?utm_medium=x  ").unwrap(),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        let cleaner = LinkCleaner::default();
        for bad in ["", "   ", "not a url", "ftp://files.example.com/x"] {
            let err = cleaner.clean(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{bad}");
        }
    }

    #[test]
    fn test_custom_config() {
        let cleaner = LinkCleaner::new(&LinksConfig {
            strip_params: vec!["session".into()],
            allowed_schemes: vec!["HTTP".into()],
        });
        assert_eq!(
            cleaner.clean("http://a.io/?session=1&utm_source=x").unwrap(),
            "http://a.io/?utm_source=x"
        );
        assert!(cleaner.clean("https://a.io").is_err());
    }

    #[tokio::test]
    async fn test_rewrite_delegates_to_clean() {
        let cleaner = LinkCleaner::default();
        let out = cleaner.rewrite("https://a.io/#top").await.unwrap();
        assert_eq!(out, "https://a.io/");
    }
}
