//! Placeholder Injector
//!
//! Splices the one-shot injection call into module source. The call carries
//! the component's placeholder token, which the bundle finalizer later swaps
//! for the real style text.

use lazy_static::lazy_static;
use regex::Regex;

use crate::registry::ComponentRecord;
use crate::tree::{Node, NodeKind};
use crate::validate::{Result, StylesInjectError};

lazy_static! {
    /// `export` (optionally `export default`) directly in front of a declaration,
    /// as a whole token rather than the tail of an identifier.
    static ref EXPORT_PREFIX_RE: Regex =
        Regex::new(r"(?:^|[^\w$])(export\s+(?:default\s+)?)$").unwrap();
}

pub struct Injector {
    routine_name: String,
}

impl Injector {
    pub fn new(routine_name: &str) -> Self {
        Self {
            routine_name: routine_name.to_string(),
        }
    }

    pub fn routine_name(&self) -> &str {
        &self.routine_name
    }

    fn guard_declaration(&self, record: &ComponentRecord) -> String {
        format!(";let {} = false;\n", record.guard_name())
    }

    fn guarded_call(&self, record: &ComponentRecord) -> String {
        let guard = record.guard_name();
        format!(
            "\nif (!{guard}) {{\n    {routine}(\"{placeholder}\",\"{id}\");\n    {guard} = true;\n}}\n",
            guard = guard,
            routine = self.routine_name,
            placeholder = record.placeholder,
            id = record.id,
        )
    }

    /// Rewrite `code` so the function declared by `node` runs the injection
    /// call on its first execution.
    ///
    /// The guard is declared right before the function (before its `export`
    /// keyword if it has one) and the conditional call opens the body.
    /// Functions without a body are returned unchanged.
    pub fn inject(&self, node: &Node, record: &ComponentRecord, code: &str) -> Result<String> {
        let NodeKind::FunctionDeclaration {
            body: Some(body), ..
        } = &node.kind
        else {
            return Ok(code.to_string());
        };

        let mut start = node.span.start as usize;
        let body_open = body.start as usize + 1;
        if body_open > code.len() || start > body_open {
            return Err(StylesInjectError::splice_range(start, body_open, code.len()));
        }
        let (Some(before), Some(_)) = (code.get(..start), code.get(start..body_open)) else {
            return Err(StylesInjectError::splice_range(start, body_open, code.len()));
        };
        if let Some(export) = EXPORT_PREFIX_RE.captures(before).and_then(|c| c.get(1)) {
            start = export.start();
        }

        let mut output = String::with_capacity(code.len() + 192);
        output.push_str(&code[..start]);
        output.push_str(&self.guard_declaration(record));
        output.push_str(&code[start..body_open]);
        output.push_str(&self.guarded_call(record));
        output.push_str(&code[body_open..]);
        Ok(output)
    }

    /// Replace `code[start..end]` with the guard declaration and the
    /// conditional call.
    pub fn inject_at_range(
        &self,
        record: &ComponentRecord,
        start: usize,
        end: usize,
        code: &str,
    ) -> Result<String> {
        let (Some(before), Some(after)) = (code.get(..start), code.get(end..)) else {
            return Err(StylesInjectError::splice_range(start, end, code.len()));
        };
        if start > end {
            return Err(StylesInjectError::splice_range(start, end, code.len()));
        }

        let mut output = String::with_capacity(code.len() + 192);
        output.push_str(before);
        output.push_str(&self.guard_declaration(record));
        output.push_str(&self.guarded_call(record));
        output.push_str(after);
        Ok(output)
    }
}
