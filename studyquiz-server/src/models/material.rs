//! Material type, title and URL validation

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Maximum length for material titles
pub const MAX_MATERIAL_TITLE_LEN: usize = 200;

/// Maximum length for stored URLs (material and thumbnail)
const MAX_URL_LEN: usize = 500;

/// Kind of study material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    File,
    Url,
}

impl MaterialType {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "url" => Ok(Self::Url),
            other => Err(ValidationError::InvalidVariant {
                field: "material_type",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Url => "url",
        }
    }
}

/// Validated material title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialTitle(String);

impl MaterialTitle {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }

        if trimmed.chars().count() > MAX_MATERIAL_TITLE_LEN {
            return Err(ValidationError::TooLong {
                field: "title",
                max: MAX_MATERIAL_TITLE_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Build a title from untrusted text (page titles, file names), cutting it
    /// down to the column limit instead of rejecting it.
    pub fn truncated(s: &str, fallback: &str) -> Self {
        let trimmed = s.trim();
        let source = if trimmed.is_empty() { fallback.trim() } else { trimmed };
        let title: String = source.chars().take(MAX_MATERIAL_TITLE_LEN).collect();
        if title.is_empty() {
            Self("untitled".to_owned())
        } else {
            Self(title)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated absolute http(s) URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebUrl(String);

impl WebUrl {
    /// Parse a web address.
    ///
    /// # Example
    /// ```
    /// use studyquiz_server::models::WebUrl;
    ///
    /// assert!(WebUrl::new("https://doc.rust-lang.org/book/").is_ok());
    /// assert!(WebUrl::new("ftp://example.com/file").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::for_field(s, "url")
    }

    pub fn for_field(s: &str, field: &'static str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field });
        }

        if trimmed.len() > MAX_URL_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_URL_LEN,
            });
        }

        let parsed = reqwest::Url::parse(trimmed).map_err(|_| ValidationError::InvalidFormat {
            field,
            reason: "must be an absolute URL",
        })?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ValidationError::InvalidFormat {
                field,
                reason: "must be an http or https URL",
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_material_type() {
        assert_eq!(MaterialType::parse("file").unwrap(), MaterialType::File);
        assert_eq!(MaterialType::parse(" URL ").unwrap(), MaterialType::Url);
        let err = MaterialType::parse("video").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidVariant { .. }));
    }

    #[test]
    fn truncated_title_falls_back() {
        assert_eq!(MaterialTitle::truncated("", "https://a.io").as_str(), "https://a.io");
        assert_eq!(MaterialTitle::truncated("  ", "  ").as_str(), "untitled");

        let long = "x".repeat(300);
        let title = MaterialTitle::truncated(&long, "");
        assert_eq!(title.as_str().chars().count(), MAX_MATERIAL_TITLE_LEN);
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(WebUrl::new("http://example.com").is_ok());
        assert!(WebUrl::new("not a url").is_err());
        assert!(WebUrl::new("mailto:someone@example.com").is_err());
        assert!(matches!(
            WebUrl::new("").unwrap_err(),
            ValidationError::Empty { field: "url" }
        ));
    }

    #[test]
    fn rejects_overlong_urls() {
        let url = format!("https://example.com/{}", "a".repeat(500));
        let err = WebUrl::new(&url).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 500, .. }));
    }
}
