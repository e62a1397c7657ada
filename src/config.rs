//! Parse-time policy.
//!
//! The loader always fails on the first structural error. What it does with data it
//! recognizes but cannot decode (a populated TLS directory, a POGO debug record, ...) is
//! a caller decision expressed through [`ParseConfig`].

/// Configuration for [`crate::Image`] loading.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Image, ParseConfig};
/// use std::path::Path;
///
/// // Abort on the first populated directory without a decoder
/// let image = Image::from_file_with_config(Path::new("app.exe"), ParseConfig::strict())?;
/// # Ok::<(), pescope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Raise [`crate::Error::Unsupported`] for a populated data directory with no decoder.
    /// When disabled the directory is recorded in [`crate::Image::unsupported`] and skipped.
    pub fail_on_unsupported_directory: bool,

    /// Raise [`crate::Error::Unsupported`] for a debug record with an unknown type tag.
    /// When disabled the record is kept as [`crate::DebugRecord::Unsupported`].
    pub fail_on_unsupported_debug: bool,

    /// Count every section containing an RVA during translation and reject ambiguous
    /// addresses. When disabled, the first containing section wins.
    pub check_section_overlap: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParseConfig {
    /// Unsupported structures are collected on the image instead of failing the parse.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            fail_on_unsupported_directory: false,
            fail_on_unsupported_debug: false,
            check_section_overlap: true,
        }
    }

    /// Any populated structure without a decoder aborts the parse.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            fail_on_unsupported_directory: true,
            fail_on_unsupported_debug: true,
            check_section_overlap: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let lenient = ParseConfig::lenient();
        assert!(!lenient.fail_on_unsupported_directory);
        assert!(!lenient.fail_on_unsupported_debug);
        assert!(lenient.check_section_overlap);

        let strict = ParseConfig::strict();
        assert!(strict.fail_on_unsupported_directory);
        assert!(strict.fail_on_unsupported_debug);
        assert!(strict.check_section_overlap);
    }

    #[test]
    fn default_is_lenient() {
        assert_eq!(ParseConfig::default(), ParseConfig::lenient());
    }
}
