//! Component Registry for the styles injector
//!
//! A [`BuildSession`] is constructed when a build starts and dropped when it
//! ends. It owns every [`ComponentRecord`], the set of placeholder ids issued
//! so far and the name of the shared injection routine.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::identity::{resolve_import, IdentityRules};
use crate::options::PluginOptions;
use crate::validate::{Result, StylesInjectError};

const PLACEHOLDER_ID_CHARACTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub const COMPONENT_ID_PREFIX: &str = "__vpsi_";
pub const ROUTINE_NAME_PREFIX: &str = "_vpis_";

/// Everything known about one component, keyed by the path of its root file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    /// Unique id, also used to name the per-function guard variable.
    pub id: String,
    /// Tag of the detector that recognized the root module.
    pub shape: Option<String>,
    /// Absolute path of the component root file.
    pub path: String,
    /// Files imported from the root module, resolved to absolute identities.
    pub files: Vec<String>,
    /// Stand-in for the concatenated style text until the bundle is finalized.
    pub placeholder: String,
    /// Normalized fragment key to style text, in first-seen order.
    pub css: Vec<(String, String)>,
}

impl ComponentRecord {
    fn new(id: String, path: &str) -> Self {
        Self {
            placeholder: format!("__#__vite-plugin-styles-inject_{}__#__", id),
            id,
            shape: None,
            path: path.to_string(),
            files: Vec::new(),
            css: Vec::new(),
        }
    }

    /// Record `specifier`, imported from `from_identity`, as one of this
    /// component's files. Bare specifiers and duplicates are ignored.
    pub fn record_dependency(&mut self, from_identity: &str, specifier: &str) -> bool {
        let Some(resolved) = resolve_import(from_identity, specifier) else {
            return false;
        };
        if self.files.contains(&resolved) {
            return false;
        }
        tracing::trace!(component = %self.path, file = %resolved, "registered dependency");
        self.files.push(resolved);
        true
    }

    /// Store the compiled text of one style block.
    ///
    /// Line breaks are removed, backslashes and double quotes escaped so the
    /// text reads back unchanged from the string literal the placeholder
    /// occupies. A second write to
    /// the same normalized key replaces the text in place.
    pub fn record_style_fragment(&mut self, rules: &IdentityRules, fragment_key: &str, text: &str) {
        let key = rules.normalize_fragment_key(fragment_key);
        let text = escape_style_text(text);
        match self.css.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = text,
            None => self.css.push((key, text)),
        }
    }

    pub fn is_dependency_of(&self, identity: &str) -> bool {
        self.files.iter().any(|f| f == identity)
    }

    /// All style fragments joined by a single space, in insertion order.
    pub fn concatenated_css(&self) -> String {
        self.css
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Name of the boolean guard that keeps the injection call to one run.
    pub fn guard_name(&self) -> String {
        format!("_${}", self.id)
    }
}

fn escape_style_text(text: &str) -> String {
    text.replace("\r\n", "")
        .replace(['\n', '\r'], "")
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILD SESSION
// ═══════════════════════════════════════════════════════════════════════════════

pub struct BuildSession {
    options: PluginOptions,
    rules: IdentityRules,
    records: Vec<ComponentRecord>,
    by_path: HashMap<String, usize>,
    issued_ids: HashSet<String>,
    routine_name: String,
}

impl BuildSession {
    pub fn new(options: PluginOptions) -> Result<Self> {
        let rules = IdentityRules::new(&options);
        let mut session = Self {
            options,
            rules,
            records: Vec::new(),
            by_path: HashMap::new(),
            issued_ids: HashSet::new(),
            routine_name: String::new(),
        };
        session.routine_name = format!("{}{}", ROUTINE_NAME_PREFIX, session.generate_placeholder_id()?);
        Ok(session)
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    pub fn rules(&self) -> &IdentityRules {
        &self.rules
    }

    /// Name the injected code calls; the finalizer recovers whatever the
    /// bundler turned it into.
    pub fn routine_name(&self) -> &str {
        &self.routine_name
    }

    /// Draw a fresh random id that was never issued in this session.
    ///
    /// Fails once the retry budget is spent on collisions; falling back to a
    /// colliding id would let two components overwrite each other's styles.
    pub fn generate_placeholder_id(&mut self) -> Result<String> {
        let length = self.options.placeholder_length;
        let max_tries = self.options.placeholder_retries;
        let mut rng = rand::thread_rng();

        for _ in 0..max_tries {
            let candidate: String = (0..length)
                .map(|_| {
                    let idx = rng.gen_range(0..PLACEHOLDER_ID_CHARACTERS.len());
                    PLACEHOLDER_ID_CHARACTERS[idx] as char
                })
                .collect();
            if self.issued_ids.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
        Err(StylesInjectError::placeholder_exhausted(max_tries))
    }

    /// The record for `path`, created with a fresh placeholder on first use.
    pub fn get_or_create(&mut self, path: &str) -> Result<&mut ComponentRecord> {
        let idx = match self.by_path.get(path) {
            Some(idx) => *idx,
            None => {
                let id = format!("{}{}", COMPONENT_ID_PREFIX, self.generate_placeholder_id()?);
                tracing::debug!(component = %path, id = %id, "new component record");
                self.records.push(ComponentRecord::new(id, path));
                self.by_path.insert(path.to_string(), self.records.len() - 1);
                self.records.len() - 1
            }
        };
        Ok(&mut self.records[idx])
    }

    pub fn get(&self, path: &str) -> Option<&ComponentRecord> {
        self.by_path.get(path).map(|idx| &self.records[*idx])
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut ComponentRecord> {
        self.by_path.get(path).map(|idx| &mut self.records[*idx])
    }

    /// The first record with a detected shape that lists `identity` among its
    /// files.
    pub fn owner_of(&self, identity: &str) -> Option<&ComponentRecord> {
        self.records
            .iter()
            .find(|record| record.shape.is_some() && record.is_dependency_of(identity))
    }

    /// Records in creation order.
    pub fn records(&self) -> &[ComponentRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ERR_PLACEHOLDER_EXHAUSTED;

    fn session() -> BuildSession {
        BuildSession::new(PluginOptions::default()).unwrap()
    }

    #[test]
    fn test_get_or_create_reuses_record() {
        let mut session = session();
        let first = session.get_or_create("/src/App.vue").unwrap().clone();
        let second = session.get_or_create("/src/App.vue").unwrap().clone();
        assert_eq!(first.id, second.id);
        assert_eq!(session.records().len(), 1);
        assert!(first.id.starts_with(COMPONENT_ID_PREFIX));
        assert_eq!(
            first.placeholder,
            format!("__#__vite-plugin-styles-inject_{}__#__", first.id)
        );
    }

    #[test]
    fn test_placeholders_are_distinct() {
        let mut session = session();
        let mut seen = HashSet::new();
        for i in 0..200 {
            let record = session.get_or_create(&format!("/src/C{}.vue", i)).unwrap();
            assert!(seen.insert(record.placeholder.clone()));
        }
        assert!(!seen.iter().any(|p| p.contains(session.routine_name())));
    }

    #[test]
    fn test_placeholder_exhaustion_is_fatal() {
        let options = PluginOptions {
            placeholder_length: 1,
            placeholder_retries: 3,
            ..PluginOptions::default()
        };
        // The routine name takes one of the 36 single-character ids.
        let mut session = BuildSession::new(options).unwrap();
        let mut failure = None;
        for _ in 0..200 {
            if let Err(err) = session.generate_placeholder_id() {
                failure = Some(err);
                break;
            }
        }
        assert_eq!(failure.map(|e| e.code), Some(ERR_PLACEHOLDER_EXHAUSTED.to_string()));
        assert!(session.issued_ids.len() <= PLACEHOLDER_ID_CHARACTERS.len());
    }

    #[test]
    fn test_record_dependency_is_unique() {
        let mut session = session();
        let record = session.get_or_create("/src/App.vue").unwrap();
        assert!(record.record_dependency("/src/App.vue", "./App.vue?vue&type=style&index=0&lang.css"));
        assert!(!record.record_dependency("/src/App.vue", "./App.vue?vue&type=style&index=0&lang.css"));
        assert!(!record.record_dependency("/src/App.vue", "vue"));
        assert_eq!(record.files.len(), 1);
        assert!(record.is_dependency_of("/src/App.vue?vue&type=style&index=0&lang.css"));
    }

    #[test]
    fn test_style_fragment_normalized_and_escaped() {
        let mut session = session();
        let rules = session.rules().clone();
        let record = session.get_or_create("foo.vue").unwrap();
        record.record_style_fragment(
            &rules,
            "foo.vue?vue&type=style&index=0&lang.css",
            ".a { color:\n red; }\r\n.b::after { content: \"x\"; }",
        );
        assert_eq!(
            record.css,
            vec![(
                "foo.vue?type=style&index=0".to_string(),
                ".a { color: red; }.b::after { content: \\\"x\\\"; }".to_string()
            )]
        );
    }

    #[test]
    fn test_style_fragment_keeps_css_escapes() {
        let mut session = session();
        let rules = session.rules().clone();
        let record = session.get_or_create("foo.vue").unwrap();
        record.record_style_fragment(
            &rules,
            "foo.vue?vue&type=style&index=0&lang.css",
            r#".i::before { content: "\f101"; }"#,
        );
        assert_eq!(record.concatenated_css(), r#".i::before { content: \"\\f101\"; }"#);
    }

    #[test]
    fn test_style_fragment_overwrite_keeps_order() {
        let mut session = session();
        let rules = session.rules().clone();
        let record = session.get_or_create("foo.vue").unwrap();
        record.record_style_fragment(&rules, "foo.vue?vue&type=style&index=0&lang.css", ".a{}");
        record.record_style_fragment(&rules, "foo.vue?vue&type=style&index=1&lang.css", ".b{}");
        record.record_style_fragment(&rules, "foo.vue?vue&type=style&index=0&scoped=1&lang.css", ".c{}");
        assert_eq!(record.concatenated_css(), ".c{} .b{}");
    }

    #[test]
    fn test_owner_requires_shape() {
        let mut session = session();
        let record = session.get_or_create("/src/App.vue").unwrap();
        record.record_dependency("/src/App.vue", "./App.vue?vue&type=style&index=0&lang.css");
        assert!(session.owner_of("/src/App.vue?vue&type=style&index=0&lang.css").is_none());

        session.get_or_create("/src/App.vue").unwrap().shape = Some("sfc".to_string());
        assert_eq!(
            session
                .owner_of("/src/App.vue?vue&type=style&index=0&lang.css")
                .map(|r| r.path.as_str()),
            Some("/src/App.vue")
        );
    }
}
