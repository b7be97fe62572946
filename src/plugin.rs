//! Host boundary.
//!
//! [`StylesInjectPlugin`] is what a bundler plugin wrapper drives: `build_start`
//! once per build, `transform` once per module (possibly from several threads)
//! and `generate_bundle` once after assembly.

#[cfg(feature = "napi")]
use napi_derive::napi;
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;

use crate::detectors::{DetectorSet, ShapeDetector};
use crate::finalize::{self, OutputChunk};
use crate::identity::IdentityRules;
use crate::inject::Injector;
use crate::options::PluginOptions;
use crate::parse::parse_module;
use crate::query::{search, AttrPath};
use crate::registry::{BuildSession, ComponentRecord};
use crate::tree::SourceTree;
use crate::validate::Result;

pub struct StylesInjectPlugin {
    options: PluginOptions,
    rules: IdentityRules,
    detectors: DetectorSet,
    session: Mutex<BuildSession>,
}

impl StylesInjectPlugin {
    pub fn new(options: PluginOptions) -> Result<Self> {
        let detectors = DetectorSet::with_defaults(&options.marker_comment);
        Self::with_detectors(options, detectors)
    }

    pub fn with_detectors(options: PluginOptions, detectors: DetectorSet) -> Result<Self> {
        Ok(Self {
            rules: IdentityRules::new(&options),
            session: Mutex::new(BuildSession::new(options.clone())?),
            options,
            detectors,
        })
    }

    /// Start a new build: forget every component and issue a new routine name.
    pub fn build_start(&self) -> Result<()> {
        let fresh = BuildSession::new(self.options.clone())?;
        *self.session.lock() = fresh;
        Ok(())
    }

    /// Transform one module.
    ///
    /// `Ok(None)` leaves the module as the host has it. Style fragments that
    /// were captured come back as an empty module.
    pub fn transform(&self, code: &str, identity: &str) -> Result<Option<String>> {
        if self.rules.is_component_root(identity) {
            let tree = parse_module(code, identity)?;
            let mut session = self.session.lock();
            let record = session.get_or_create(identity)?;
            register_imports(record, &tree, identity);

            let Some(detector) = self.detectors.detect(&tree) else {
                tracing::debug!(component = %identity, "no known component shape");
                return Ok(None);
            };
            tracing::debug!(component = %identity, shape = detector.tag(), "detected component shape");
            record.shape = Some(detector.tag().to_string());
            return self.process_component_file(session, identity, detector, identity, code);
        }

        let session = self.session.lock();
        let Some((path, shape)) = session
            .owner_of(identity)
            .and_then(|record| Some((record.path.clone(), record.shape.clone()?)))
        else {
            return Ok(None);
        };
        let Some(detector) = self.detectors.get(&shape) else {
            tracing::warn!(shape = %shape, "component shape has no registered detector");
            return Ok(None);
        };
        self.process_component_file(session, &path, detector, identity, code)
    }

    fn process_component_file(
        &self,
        mut session: MutexGuard<'_, BuildSession>,
        component: &str,
        detector: &dyn ShapeDetector,
        identity: &str,
        code: &str,
    ) -> Result<Option<String>> {
        if self.rules.is_parsable(identity) {
            let injector = Injector::new(session.routine_name());
            let Some(record) = session.get(component).cloned() else {
                return Ok(None);
            };
            drop(session);
            return detector
                .process(&record, &injector, identity, code)
                .map(Some);
        }

        if self.rules.is_style_fragment(identity) {
            if let Some(record) = session.get_mut(component) {
                record.record_style_fragment(&self.rules, identity, code);
                tracing::debug!(component = %component, fragment = %identity, "stored style fragment");
                return Ok(Some(String::new()));
            }
        }
        Ok(None)
    }

    /// Finalize the emitted chunks in place. Returns the recovered routine name.
    pub fn generate_bundle(&self, chunks: &mut [OutputChunk]) -> Option<String> {
        let session = self.session.lock();
        finalize::generate_bundle(chunks, session.records())
    }

    pub fn routine_name(&self) -> String {
        self.session.lock().routine_name().to_string()
    }

    pub fn records(&self) -> Vec<ComponentRecord> {
        self.session.lock().records().to_vec()
    }
}

/// Record every relative import of the root module as a component file.
fn register_imports(record: &mut ComponentRecord, tree: &SourceTree, identity: &str) {
    let source_path = AttrPath::parse("source.value");
    for node in search(&tree.root, "ImportDeclaration", &[]) {
        if let Some(Value::String(specifier)) = source_path.resolve(node) {
            if !specifier.is_empty() {
                record.record_dependency(identity, &specifier);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi(js_name = "StylesInjectSession")]
pub struct NativeStylesInject {
    inner: StylesInjectPlugin,
}

#[cfg(feature = "napi")]
#[napi]
impl NativeStylesInject {
    #[napi(constructor)]
    pub fn new(options: Option<serde_json::Value>) -> napi::Result<Self> {
        let inner = match options {
            Some(value) => PluginOptions::from_value(value),
            None => Ok(PluginOptions::default()),
        }
        .and_then(StylesInjectPlugin::new)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
        Ok(Self { inner })
    }

    #[napi]
    pub fn build_start(&self) -> napi::Result<()> {
        self.inner
            .build_start()
            .map_err(|e| napi::Error::from_reason(e.to_string()))
    }

    #[napi]
    pub fn transform(&self, code: String, id: String) -> napi::Result<Option<String>> {
        self.inner
            .transform(&code, &id)
            .map_err(|e| napi::Error::from_reason(e.to_string()))
    }

    #[napi]
    pub fn generate_bundle(&self, chunks: Vec<OutputChunk>) -> Vec<OutputChunk> {
        let mut chunks = chunks;
        self.inner.generate_bundle(&mut chunks);
        chunks
    }

    #[napi(getter)]
    pub fn name(&self) -> String {
        crate::options::PLUGIN_NAME.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin() -> StylesInjectPlugin {
        StylesInjectPlugin::new(PluginOptions::default()).unwrap()
    }

    #[test]
    fn test_unrelated_module_passes_through() {
        let plugin = plugin();
        assert_eq!(plugin.transform("export const a = 1;", "/src/main.ts").unwrap(), None);
        assert!(plugin.records().is_empty());
    }

    #[test]
    fn test_root_without_shape_passes_through() {
        let plugin = plugin();
        let out = plugin
            .transform("export default { name: 'Plain' };", "/src/Plain.vue")
            .unwrap();
        assert_eq!(out, None);
        assert_eq!(plugin.records()[0].shape, None);
    }

    #[test]
    fn test_imports_registered_on_root() {
        let plugin = plugin();
        let code = "import './Foo.vue?vue&type=style&index=0&lang.css';\nimport { ref } from 'vue';\nimport helper from '../lib/helper.js';\nfunction _sfc_render() {}";
        plugin.transform(code, "/src/components/Foo.vue").unwrap();
        let record = &plugin.records()[0];
        assert_eq!(
            record.files,
            vec![
                "/src/components/Foo.vue?vue&type=style&index=0&lang.css".to_string(),
                "/src/lib/helper.js".to_string(),
            ]
        );
        assert_eq!(record.shape.as_deref(), Some("sfc"));
    }

    #[test]
    fn test_build_start_resets_session() {
        let plugin = plugin();
        plugin
            .transform("function _sfc_render() {}", "/src/A.vue")
            .unwrap();
        let before = plugin.routine_name();
        plugin.build_start().unwrap();
        assert!(plugin.records().is_empty());
        assert_ne!(plugin.routine_name(), before);
    }

    #[test]
    fn test_parse_error_propagates() {
        let plugin = plugin();
        assert!(plugin.transform("function _sfc_render( {", "/src/A.vue").is_err());
    }
}
