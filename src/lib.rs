//! # Deferred Component Style Injection
//!
//! Compiled single-file components normally ship their styles as separate
//! CSS. This crate keeps each component's styles next to its code instead:
//!
//! 1. **Transform.** Every component root module is parsed and matched
//!    against a fixed list of shape detectors. The matching detector splices
//!    a guarded call `_vpis_xxxx("<placeholder>", "<component id>")` into the
//!    render function, so the call runs once per function instance.
//! 2. **Collect.** Style block modules belonging to a known component are
//!    swallowed (transformed to an empty module) and their text is stored on
//!    the component's record.
//! 3. **Finalize.** After the bundle is assembled, every placeholder is
//!    replaced by the component's concatenated style text and the injection
//!    routine, under whatever name the bundler gave it, is prepended to each
//!    chunk that calls it.
//!
//! All per-build state lives in a [`BuildSession`], owned by
//! [`StylesInjectPlugin`] and replaced on [`StylesInjectPlugin::build_start`].

mod detectors;
mod finalize;
mod identity;
mod inject;
mod options;
mod parse;
mod query;
mod registry;
mod tree;
mod validate;
mod visitor;

pub mod plugin;


pub use detectors::{
    ClassComponentDetector, DetectorSet, MarkerDetector, SfcDetector, ShapeDetector,
    SFC_RENDER_NAME,
};
pub use finalize::{injection_routine_source, recover_callee_name, OutputChunk};
pub use identity::{resolve_import, IdentityRules};
pub use inject::Injector;
pub use options::{PluginOptions, PLUGIN_APPLY, PLUGIN_NAME};
pub use parse::parse_module;
pub use plugin::StylesInjectPlugin;
pub use query::{are_equal, search, AttrPath};
pub use registry::{BuildSession, ComponentRecord};
pub use tree::{Attr, Comment, Identifier, Node, NodeKind, SourceTree, Span};
pub use validate::*;
pub use visitor::{traverse, walk_children};

#[cfg(feature = "napi")]
pub use plugin::NativeStylesInject;
