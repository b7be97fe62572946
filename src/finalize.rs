//! Finalize Module for the styles injector
//!
//! Runs once over the emitted chunks after every module was transformed:
//! recovers the name the bundler gave the injection routine, swaps each
//! placeholder for its component's style text and prepends the routine's
//! definition to the chunks that call it.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::registry::ComponentRecord;

/// One emitted output file. Assets carry no code and are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct OutputChunk {
    pub file_name: String,
    pub code: Option<String>,
}

impl OutputChunk {
    pub fn code(file_name: &str, code: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            code: Some(code.to_string()),
        }
    }

    pub fn asset(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            code: None,
        }
    }
}

/// Browser-side routine appending a `<style>` element (reused by id) to `<head>`.
pub fn injection_routine_source(name: &str) -> String {
    format!(
        r#"function {name}(e, t) {{
    if (e && "undefined" != typeof document) {{
        var d = document.head || document.getElementsByTagName("head")[0],
            a = document.getElementById(t) || document.createElement("style");
        a.id = t, a.type = "text/css", a.appendChild(document.createTextNode(e)), d.appendChild(a)
    }}
}}"#,
        name = name
    )
}

fn is_callee_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

/// Name of the function called with the placeholder at `placeholder_at` as
/// its first argument, read backwards from the `(` that sits two bytes before
/// the placeholder (the other byte being the opening quote).
///
/// Minifiers may rename the routine to any identifier, so uppercase letters
/// and `$` are accepted alongside `[a-z0-9_]`.
pub fn recover_callee_name(code: &str, placeholder_at: usize) -> Option<String> {
    let bytes = code.as_bytes();
    if placeholder_at < 2 || bytes[placeholder_at - 2] != b'(' {
        return None;
    }
    let end = placeholder_at - 2;
    let mut start = end;
    while start > 0 && is_callee_char(bytes[start - 1]) {
        start -= 1;
    }
    if start == end {
        return None;
    }
    Some(code[start..end].to_string())
}

/// Find the routine name in the first chunk, in bundle order, where some
/// record's placeholder sits in a call position.
pub fn capture_routine_name(chunks: &[OutputChunk], records: &[ComponentRecord]) -> Option<String> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.code.as_deref())
        .find_map(|code| {
            records.iter().find_map(|record| {
                code.find(&record.placeholder)
                    .and_then(|at| recover_callee_name(code, at))
            })
        })
}

/// Whether some placeholder in `code` is the first argument of a call.
fn has_routine_call(code: &str, records: &[ComponentRecord]) -> bool {
    records.iter().any(|record| {
        code.match_indices(&record.placeholder)
            .any(|(at, _)| recover_callee_name(code, at).is_some())
    })
}

/// Replace every placeholder in `code` with the owning record's style text.
/// Returns whether any placeholder was present.
pub fn resolve_placeholders(code: &mut String, records: &[ComponentRecord]) -> bool {
    let mut resolved = false;
    for record in records {
        if code.contains(&record.placeholder) {
            *code = code.replace(&record.placeholder, &record.concatenated_css());
            resolved = true;
        }
    }
    resolved
}

/// Finalize the bundle in place.
///
/// The routine name is captured serially, once, from the first chunk that
/// reveals it; after that each chunk is resolved independently. The routine
/// definition is prepended to every chunk that calls it with a placeholder.
pub fn generate_bundle(chunks: &mut [OutputChunk], records: &[ComponentRecord]) -> Option<String> {
    let routine_name = capture_routine_name(chunks, records);
    match &routine_name {
        Some(name) => tracing::debug!(routine = %name, "captured injection routine name"),
        None => tracing::debug!("no injection call found in bundle"),
    }

    let prelude = routine_name.as_deref().map(injection_routine_source);
    chunks.par_iter_mut().for_each(|chunk| {
        let Some(code) = chunk.code.as_mut() else {
            return;
        };
        let calls_routine = has_routine_call(code, records);
        if resolve_placeholders(code, records) {
            tracing::trace!(chunk = %chunk.file_name, "resolved style placeholders");
        }
        if let (true, Some(prelude)) = (calls_routine, &prelude) {
            code.insert_str(0, &format!("{}\n", prelude));
        }
    });
    routine_name
}
