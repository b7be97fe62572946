//! Module identity helpers.
//!
//! An identity is the resolved path the host hands to `transform`, optionally
//! followed by a `?query` describing which block of a component it is, e.g.
//! `/src/App.vue?vue&type=style&index=0&lang.css`.

use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::options::PluginOptions;

/// Identity classification compiled once from the plugin options.
#[derive(Debug, Clone)]
pub struct IdentityRules {
    component_extension: String,
    script_re: Option<Regex>,
    style_re: Option<Regex>,
    kept_query_params: Vec<String>,
}

fn lang_marker_regex(langs: &[String]) -> Option<Regex> {
    if langs.is_empty() {
        return None;
    }
    let alternatives = langs
        .iter()
        .map(|lang| regex::escape(lang))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"lang\.(?:{})(?:$|&)", alternatives)).ok()
}

impl IdentityRules {
    pub fn new(options: &PluginOptions) -> Self {
        Self {
            component_extension: options.component_extension.clone(),
            script_re: lang_marker_regex(&options.script_langs),
            style_re: lang_marker_regex(&options.style_langs),
            kept_query_params: options.kept_query_params.clone(),
        }
    }

    /// The component file itself, without any block query.
    pub fn is_component_root(&self, identity: &str) -> bool {
        identity.ends_with(&self.component_extension)
    }

    /// Identities whose text is JavaScript the detectors can parse.
    pub fn is_parsable(&self, identity: &str) -> bool {
        self.is_component_root(identity)
            || self
                .script_re
                .as_ref()
                .is_some_and(|re| re.is_match(identity))
    }

    /// Compiled style output of one `<style>` block.
    pub fn is_style_fragment(&self, identity: &str) -> bool {
        self.style_re
            .as_ref()
            .is_some_and(|re| re.is_match(identity))
    }

    /// Drop every query parameter not on the allow-list.
    ///
    /// Kept parameters are emitted in allow-list order so two decorations of
    /// the same style request collapse onto one key. With nothing kept the
    /// bare path is returned.
    pub fn normalize_fragment_key(&self, identity: &str) -> String {
        let Some((path, query)) = identity.split_once('?') else {
            return identity.to_string();
        };
        let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let kept: Vec<String> = self
            .kept_query_params
            .iter()
            .filter_map(|name| {
                params
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(key, value)| format!("{}={}", key, value))
            })
            .collect();

        if kept.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, kept.join("&"))
        }
    }
}

/// Resolve an import specifier against the directory of the importing module.
///
/// Only relative (`.`) and absolute (`/`) specifiers resolve; bare package
/// imports yield `None`. Resolution is purely lexical, the file system is
/// never consulted.
pub fn resolve_import(from_identity: &str, specifier: &str) -> Option<String> {
    if !(specifier.starts_with('.') || specifier.starts_with('/')) {
        return None;
    }
    let from_path = from_identity.split('?').next().unwrap_or(from_identity);
    let base = Path::new(from_path).parent().unwrap_or_else(|| Path::new("/"));
    Some(normalize_path(&base.join(specifier)))
}

fn normalize_path(path: &Path) -> String {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> IdentityRules {
        IdentityRules::new(&PluginOptions::default())
    }

    #[test]
    fn test_component_root() {
        let rules = rules();
        assert!(rules.is_component_root("/src/App.vue"));
        assert!(!rules.is_component_root("/src/App.vue?vue&type=style&index=0&lang.css"));
        assert!(!rules.is_component_root("/src/main.ts"));
    }

    #[test]
    fn test_parsable() {
        let rules = rules();
        assert!(rules.is_parsable("/src/App.vue"));
        assert!(rules.is_parsable("/src/App.vue?vue&type=script&setup=true&lang.ts"));
        assert!(rules.is_parsable("/src/App.vue?vue&type=template&lang.js"));
        assert!(!rules.is_parsable("/src/App.vue?vue&type=style&index=0&lang.css"));
    }

    #[test]
    fn test_style_fragment() {
        let rules = rules();
        assert!(rules.is_style_fragment("/src/App.vue?vue&type=style&index=0&lang.css"));
        assert!(rules.is_style_fragment("/src/App.vue?vue&type=style&index=1&scoped=abc&lang.scss"));
        assert!(rules.is_style_fragment("/src/App.vue?vue&type=style&index=0&lang.less&inline"));
        assert!(!rules.is_style_fragment("/src/App.vue?vue&type=script&lang.ts"));
        assert!(!rules.is_style_fragment("/src/style.css"));
    }

    #[test]
    fn test_normalize_keeps_allow_list_in_order() {
        let rules = rules();
        assert_eq!(
            rules.normalize_fragment_key("foo.vue?vue&type=style&index=0&lang.css"),
            "foo.vue?type=style&index=0"
        );
        assert_eq!(
            rules.normalize_fragment_key("foo.vue?index=2&scoped=1&type=style&lang.css"),
            "foo.vue?type=style&index=2"
        );
    }

    #[test]
    fn test_normalize_without_kept_params() {
        let rules = rules();
        assert_eq!(rules.normalize_fragment_key("foo.vue?vue&lang.css"), "foo.vue");
        assert_eq!(rules.normalize_fragment_key("foo.vue"), "foo.vue");
    }

    #[test]
    fn test_resolve_relative_imports() {
        assert_eq!(
            resolve_import(
                "/src/components/App.vue",
                "./App.vue?vue&type=style&index=0&lang.css"
            ),
            Some("/src/components/App.vue?vue&type=style&index=0&lang.css".to_string())
        );
        assert_eq!(
            resolve_import("/src/components/App.vue", "../util/helpers.js"),
            Some("/src/util/helpers.js".to_string())
        );
        assert_eq!(
            resolve_import("/src/App.vue", "/abs/x.js"),
            Some("/abs/x.js".to_string())
        );
        assert_eq!(resolve_import("/src/App.vue", "vue"), None);
    }
}
