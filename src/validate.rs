#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "VPSI-ERR-PARSE-001";
pub const ERR_PLACEHOLDER_EXHAUSTED: &str = "VPSI-ERR-PLACEHOLDER-001";
pub const ERR_SPLICE_RANGE: &str = "VPSI-ERR-SPLICE-001";
pub const ERR_OPTIONS: &str = "VPSI-ERR-OPTIONS-001";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_PARSE => "A component is never emitted without its style injection call.",
        ERR_PLACEHOLDER_EXHAUSTED => {
            "Placeholder tokens are unique for the whole build; two components never share one."
        }
        ERR_SPLICE_RANGE => "Source is only spliced on valid character boundaries.",
        ERR_OPTIONS => "Plugin options are validated before the first module is transformed.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLUGIN ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Fatal error raised while transforming a module or finalizing a bundle.
///
/// Only genuine failures end up here. A module that no detector recognizes, a
/// chunk without placeholders, or a file nobody owns are all pass-through
/// results and never produce a `StylesInjectError`.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
#[error("[{code}] {message} ({file}:{line}:{column})")]
pub struct StylesInjectError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

impl StylesInjectError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_hints(code, message, file, line, column, vec![])
    }

    pub fn with_hints(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        hints: Vec<String>,
    ) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            hints,
        }
    }

    pub fn parse(message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::new(ERR_PARSE, message, file, line, column)
    }

    pub fn placeholder_exhausted(tries: usize) -> Self {
        Self::with_hints(
            ERR_PLACEHOLDER_EXHAUSTED,
            &format!("Failed to generate a placeholder id after {} tries.", tries),
            "",
            0,
            0,
            vec!["Increase `placeholderLength` or `placeholderRetries`.".to_string()],
        )
    }

    pub fn splice_range(start: usize, end: usize, len: usize) -> Self {
        Self::new(
            ERR_SPLICE_RANGE,
            &format!(
                "Cannot splice range {}..{} into source of {} bytes.",
                start, end, len
            ),
            "",
            0,
            0,
        )
    }

    pub fn options(message: &str) -> Self {
        Self::new(ERR_OPTIONS, message, "", 0, 0)
    }
}

pub type Result<T, E = StylesInjectError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_guarantee() {
        let err = StylesInjectError::parse("Unexpected token", "/src/App.vue", 3, 7);
        assert_eq!(err.code, ERR_PARSE);
        assert!(err.guarantee.contains("style injection"));
        assert_eq!(
            err.to_string(),
            "[VPSI-ERR-PARSE-001] Unexpected token (/src/App.vue:3:7)"
        );
    }

    #[test]
    fn test_placeholder_exhaustion_has_hint() {
        let err = StylesInjectError::placeholder_exhausted(10);
        assert_eq!(err.code, ERR_PLACEHOLDER_EXHAUSTED);
        assert!(err.message.contains("10 tries"));
        assert_eq!(err.hints.len(), 1);
    }
}
