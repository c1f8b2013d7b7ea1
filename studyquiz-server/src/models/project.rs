//! Project name and color validation

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Maximum length for project names
const MAX_PROJECT_NAME_LEN: usize = 100;

/// Color used when the client doesn't pick one
pub const DEFAULT_PROJECT_COLOR: &str = "#3B82F6";

/// Hex color: `#` followed by six hex digits
static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("invalid color regex"));

/// Validated project name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectName(String);

impl ProjectName {
    /// Create a new project name.
    ///
    /// # Rules
    /// - Non-empty (after trimming whitespace)
    /// - Max 100 characters
    ///
    /// # Example
    /// ```
    /// use studyquiz_server::models::ProjectName;
    ///
    /// assert!(ProjectName::new("Linear Algebra").is_ok());
    /// assert!(ProjectName::new("   ").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }

        if trimmed.chars().count() > MAX_PROJECT_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_PROJECT_NAME_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated `#RRGGBB` color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectColor(String);

impl ProjectColor {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if !HEX_COLOR_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidFormat {
                field: "color",
                reason: "must be a hex color like #3B82F6",
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectColor {
    fn default() -> Self {
        Self(DEFAULT_PROJECT_COLOR.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_name() {
        let name = ProjectName::new("  Biology  ").unwrap();
        assert_eq!(name.as_str(), "Biology");
    }

    #[test]
    fn rejects_empty_name() {
        let err = ProjectName::new("").unwrap_err();
        assert!(matches!(err, ValidationError::Empty { .. }));
    }

    #[test]
    fn name_max_length_counts_chars() {
        // multi-byte characters count once each
        let name_100 = "가".repeat(100);
        assert!(ProjectName::new(&name_100).is_ok());

        let name_101 = "a".repeat(101);
        let err = ProjectName::new(&name_101).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 100, .. }));
    }

    #[test]
    fn color_format() {
        assert!(ProjectColor::new("#3B82F6").is_ok());
        assert!(ProjectColor::new("#abcdef").is_ok());
        assert!(ProjectColor::new("3B82F6").is_err());
        assert!(ProjectColor::new("#3B82F").is_err());
        assert!(ProjectColor::new("#GGGGGG").is_err());
    }

    #[test]
    fn default_color() {
        assert_eq!(ProjectColor::default().as_str(), DEFAULT_PROJECT_COLOR);
    }
}
