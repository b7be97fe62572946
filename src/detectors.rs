//! Shape Detectors
//!
//! Compiled component output comes in a few structural shapes. Each detector
//! recognizes one of them on the component root module and knows where inside
//! that shape the injection call belongs.

use serde_json::json;

use crate::inject::Injector;
use crate::parse::parse_module;
use crate::query::search;
use crate::registry::ComponentRecord;
use crate::tree::{Node, NodeKind, SourceTree};
use crate::validate::Result;

/// Internal name the SFC compiler gives the render function.
pub const SFC_RENDER_NAME: &str = "_sfc_render";

pub trait ShapeDetector: Send + Sync {
    /// Stable tag stored on the component record.
    fn tag(&self) -> &'static str;

    /// Whether the root module's tree has this shape.
    fn supports(&self, tree: &SourceTree) -> bool;

    /// Rewrite one of the component's parsable modules. Modules in which the
    /// injection point is absent come back unchanged.
    fn process(
        &self,
        record: &ComponentRecord,
        injector: &Injector,
        identity: &str,
        code: &str,
    ) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// DETECTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Overload signatures and `declare`d functions share the name of the
/// implementation but have nowhere to put the call.
fn first_with_body<'n>(nodes: &[&'n Node]) -> Option<&'n Node> {
    nodes
        .iter()
        .copied()
        .find(|node| matches!(node.kind, NodeKind::FunctionDeclaration { body: Some(_), .. }))
}

/// Render function compiled inline into the component module:
/// `function _sfc_render(_ctx, _cache) { ... }`.
pub struct SfcDetector;

impl ShapeDetector for SfcDetector {
    fn tag(&self) -> &'static str {
        "sfc"
    }

    fn supports(&self, tree: &SourceTree) -> bool {
        !search(
            &tree.root,
            "FunctionDeclaration",
            &[("id.name", json!(SFC_RENDER_NAME))],
        )
        .is_empty()
    }

    fn process(
        &self,
        record: &ComponentRecord,
        injector: &Injector,
        identity: &str,
        code: &str,
    ) -> Result<String> {
        let tree = parse_module(code, identity)?;
        let nodes = search(
            &tree.root,
            "FunctionDeclaration",
            &[("id.name", json!(SFC_RENDER_NAME))],
        );
        match first_with_body(&nodes) {
            Some(node) => injector.inject(node, record, code),
            None => Ok(code.to_string()),
        }
    }
}

/// Render function living in a separate template module and imported as
/// `import { render as _sfc_render } from "./Comp.vue?vue&type=template..."`.
/// The injection goes into that template module's `render`.
pub struct ClassComponentDetector;

impl ShapeDetector for ClassComponentDetector {
    fn tag(&self) -> &'static str {
        "classComponent"
    }

    fn supports(&self, tree: &SourceTree) -> bool {
        !search(
            &tree.root,
            "ImportSpecifier",
            &[
                ("imported.name", json!("render")),
                ("local.name", json!(SFC_RENDER_NAME)),
            ],
        )
        .is_empty()
    }

    fn process(
        &self,
        record: &ComponentRecord,
        injector: &Injector,
        identity: &str,
        code: &str,
    ) -> Result<String> {
        let tree = parse_module(code, identity)?;
        let nodes = search(
            &tree.root,
            "FunctionDeclaration",
            &[("id.name", json!("render"))],
        );
        match first_with_body(&nodes) {
            Some(node) => injector.inject(node, record, code),
            None => Ok(code.to_string()),
        }
    }
}

/// Modules that mark the injection point explicitly with a block comment,
/// e.g. `/* @styles-inject */`. The comment is replaced by the call.
pub struct MarkerDetector {
    marker: String,
}

impl MarkerDetector {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
        }
    }
}

impl ShapeDetector for MarkerDetector {
    fn tag(&self) -> &'static str {
        "marker"
    }

    fn supports(&self, tree: &SourceTree) -> bool {
        tree.comments.iter().any(|c| c.text == self.marker)
    }

    fn process(
        &self,
        record: &ComponentRecord,
        injector: &Injector,
        identity: &str,
        code: &str,
    ) -> Result<String> {
        let tree = parse_module(code, identity)?;
        match tree.comments.iter().find(|c| c.text == self.marker) {
            Some(comment) => injector.inject_at_range(
                record,
                comment.span.start as usize,
                comment.span.end as usize,
                code,
            ),
            None => Ok(code.to_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DETECTOR SET
// ═══════════════════════════════════════════════════════════════════════════════

/// Registered detectors, consulted in registration order.
pub struct DetectorSet {
    detectors: Vec<Box<dyn ShapeDetector>>,
}

impl DetectorSet {
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// The stock set: `sfc`, then `classComponent`, then `marker`.
    pub fn with_defaults(marker: &str) -> Self {
        let mut set = Self::empty();
        set.register(Box::new(SfcDetector));
        set.register(Box::new(ClassComponentDetector));
        set.register(Box::new(MarkerDetector::new(marker)));
        set
    }

    /// Append a detector. A detector whose tag is already registered replaces
    /// the old one in its original position.
    pub fn register(&mut self, detector: Box<dyn ShapeDetector>) {
        match self.detectors.iter().position(|d| d.tag() == detector.tag()) {
            Some(idx) => self.detectors[idx] = detector,
            None => self.detectors.push(detector),
        }
    }

    pub fn get(&self, tag: &str) -> Option<&dyn ShapeDetector> {
        self.detectors
            .iter()
            .find(|d| d.tag() == tag)
            .map(|d| d.as_ref())
    }

    /// First detector, in priority order, that supports `tree`.
    pub fn detect(&self, tree: &SourceTree) -> Option<&dyn ShapeDetector> {
        self.detectors
            .iter()
            .find(|d| d.supports(tree))
            .map(|d| d.as_ref())
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.tag()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PluginOptions;
    use crate::registry::BuildSession;

    fn record() -> ComponentRecord {
        let mut session = BuildSession::new(PluginOptions::default()).unwrap();
        session.get_or_create("/src/App.vue").unwrap().clone()
    }

    fn detect_tag(code: &str) -> Option<&'static str> {
        let tree = parse_module(code, "/src/App.vue").unwrap();
        DetectorSet::with_defaults("@styles-inject")
            .detect(&tree)
            .map(|d| d.tag())
    }

    #[test]
    fn test_default_order() {
        assert_eq!(
            DetectorSet::with_defaults("@styles-inject").tags(),
            vec!["sfc", "classComponent", "marker"]
        );
    }

    #[test]
    fn test_detects_sfc_shape() {
        let code = "const _sfc_main = {};\nfunction _sfc_render(_ctx, _cache) { return null; }\nexport default _sfc_main;";
        assert_eq!(detect_tag(code), Some("sfc"));
    }

    #[test]
    fn test_detects_class_component_shape() {
        let code = "import { render as _sfc_render } from './App.vue?vue&type=template&lang.js';\nexport default {};";
        assert_eq!(detect_tag(code), Some("classComponent"));
    }

    #[test]
    fn test_sfc_wins_over_marker() {
        let code = "/* @styles-inject */\nfunction _sfc_render() {}";
        assert_eq!(detect_tag(code), Some("sfc"));
    }

    #[test]
    fn test_detects_marker_shape() {
        assert_eq!(detect_tag("/* @styles-inject */\nexport default {};"), Some("marker"));
    }

    #[test]
    fn test_no_shape() {
        assert_eq!(detect_tag("export default { name: 'StyleOnly' };"), None);
    }

    #[test]
    fn test_class_component_root_is_left_alone() {
        let code = "import { render as _sfc_render } from './App.vue?vue&type=template&lang.js';\nexport default {};";
        let out = ClassComponentDetector
            .process(&record(), &Injector::new("_vpis_t"), "/src/App.vue", code)
            .unwrap();
        assert_eq!(out, code);
    }

    #[test]
    fn test_class_component_template_module_is_injected() {
        let record = record();
        let code = "import { h } from 'vue';\nexport function render(_ctx) { return h('div'); }";
        let out = ClassComponentDetector
            .process(
                &record,
                &Injector::new("_vpis_t"),
                "/src/App.vue?vue&type=template&lang.js",
                code,
            )
            .unwrap();
        assert!(out.contains(&format!("_vpis_t(\"{}\",\"{}\")", record.placeholder, record.id)));
    }

    #[test]
    fn test_overload_signature_is_skipped() {
        let record = record();
        let code = "import { h } from 'vue';\nexport function render(a: number): void;\nexport function render(a: any) {\n  return h('div');\n}\n";
        let identity = "/src/App.vue?vue&type=template&lang.ts";
        let out = ClassComponentDetector
            .process(&record, &Injector::new("_vpis_t"), identity, code)
            .unwrap();
        assert!(out.contains(&format!("_vpis_t(\"{}\",\"{}\")", record.placeholder, record.id)));
        assert!(out.contains(&format!(
            "render(a: number): void;\n;let _${} = false;\nexport function render(a: any)",
            record.id
        )));
        assert!(parse_module(&out, identity).is_ok());
    }

    #[test]
    fn test_declared_sfc_render_is_skipped() {
        let record = record();
        let code = "declare function _sfc_render(): void;\nfunction _sfc_render() { return null; }";
        let identity = "/src/App.vue?vue&type=script&lang.ts";
        let out = SfcDetector
            .process(&record, &Injector::new("_vpis_t"), identity, code)
            .unwrap();
        assert!(out.starts_with(&format!(
            "declare function _sfc_render(): void;\n;let _${} = false;\nfunction _sfc_render()",
            record.id
        )));
    }

    struct AlwaysDetector;

    impl ShapeDetector for AlwaysDetector {
        fn tag(&self) -> &'static str {
            "sfc"
        }

        fn supports(&self, _tree: &SourceTree) -> bool {
            true
        }

        fn process(
            &self,
            _record: &ComponentRecord,
            _injector: &Injector,
            _identity: &str,
            code: &str,
        ) -> Result<String> {
            Ok(code.to_uppercase())
        }
    }

    #[test]
    fn test_register_replaces_same_tag_in_place() {
        let mut set = DetectorSet::with_defaults("@styles-inject");
        set.register(Box::new(AlwaysDetector));
        assert_eq!(set.tags(), vec!["sfc", "classComponent", "marker"]);
        let tree = parse_module("export default {};", "/src/App.vue").unwrap();
        let detector = set.detect(&tree).unwrap();
        assert_eq!(
            detector
                .process(&record(), &Injector::new("_vpis_t"), "/src/App.vue", "x")
                .unwrap(),
            "X"
        );
        assert!(set.get("classComponent").is_some());
        assert!(set.get("missing").is_none());
    }
}
