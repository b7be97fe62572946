//! Plugin configuration.
//!
//! Every field has a default so hosts can pass a partial JSON object (or
//! nothing at all) and get the stock Vue behaviour.

use serde::{Deserialize, Serialize};

use crate::validate::{Result, StylesInjectError};

pub const PLUGIN_NAME: &str = "vue-styles-inject";

/// Hook phase the plugin participates in. Dev servers inject styles natively.
pub const PLUGIN_APPLY: &str = "build";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginOptions {
    /// Extension of component root files.
    pub component_extension: String,
    /// `lang.<tag>` markers of compiled script output.
    pub script_langs: Vec<String>,
    /// `lang.<tag>` markers of compiled style output.
    pub style_langs: Vec<String>,
    /// Query parameters kept when normalizing a style fragment identity, in output order.
    pub kept_query_params: Vec<String>,
    pub placeholder_length: usize,
    pub placeholder_retries: usize,
    /// Block comment text replaced by the injection block in marker-shaped modules.
    pub marker_comment: String,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            component_extension: ".vue".to_string(),
            script_langs: ["js", "ts", "jsx", "tsx"].map(String::from).to_vec(),
            style_langs: ["css", "scss", "sass", "less", "styl", "stylus"]
                .map(String::from)
                .to_vec(),
            kept_query_params: ["type", "index"].map(String::from).to_vec(),
            placeholder_length: 8,
            placeholder_retries: 10,
            marker_comment: "@styles-inject".to_string(),
        }
    }
}

impl PluginOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let options: PluginOptions = serde_json::from_str(json)
            .map_err(|e| StylesInjectError::options(&format!("Invalid plugin options: {}", e)))?;
        options.checked()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let options: PluginOptions = serde_json::from_value(value)
            .map_err(|e| StylesInjectError::options(&format!("Invalid plugin options: {}", e)))?;
        options.checked()
    }

    fn checked(self) -> Result<Self> {
        if self.placeholder_length == 0 {
            return Err(StylesInjectError::options(
                "`placeholderLength` must be greater than zero.",
            ));
        }
        if self.placeholder_retries == 0 {
            return Err(StylesInjectError::options(
                "`placeholderRetries` must be greater than zero.",
            ));
        }
        if self.component_extension.is_empty() {
            return Err(StylesInjectError::options(
                "`componentExtension` must not be empty.",
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ERR_OPTIONS;

    #[test]
    fn test_defaults_match_vue() {
        let options = PluginOptions::default();
        assert_eq!(options.component_extension, ".vue");
        assert_eq!(options.kept_query_params, vec!["type", "index"]);
        assert!(options.style_langs.contains(&"less".to_string()));
        assert_eq!(options.placeholder_length, 8);
        assert_eq!(options.placeholder_retries, 10);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = PluginOptions::from_json(r#"{ "styleLangs": ["css"] }"#).unwrap();
        assert_eq!(options.style_langs, vec!["css"]);
        assert_eq!(options.component_extension, ".vue");
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(PluginOptions::from_json("  ").unwrap(), PluginOptions::default());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let err = PluginOptions::from_json(r#"{ "placeholderLength": 0 }"#).unwrap_err();
        assert_eq!(err.code, ERR_OPTIONS);

        let err = PluginOptions::from_json("{ not json").unwrap_err();
        assert_eq!(err.code, ERR_OPTIONS);
    }
}
