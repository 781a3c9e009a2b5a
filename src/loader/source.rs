use std::fmt;
use std::path::PathBuf;

/// Where the boundary archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Remote(String),
    Local(PathBuf),
}

impl SourceLocator {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Remote(trimmed.to_string())
        } else {
            Self::Local(PathBuf::from(trimmed))
        }
    }

    /// Key for the per-locator collection cache.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
