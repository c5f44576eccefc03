//! Pending descriptions.

use tracing::warn;

/// A description waiting for the next declaration.
///
/// Set with `describe(..)` and consumed by the declaration that follows.
#[derive(Debug, Default)]
pub(crate) struct PendingDescription {
    text: Option<String>,
}

impl PendingDescription {
    pub(crate) fn set(&mut self, text: &str) {
        if let Some(previous) = self.text.replace(trim_indent(text)) {
            warn!(description = %previous, "Overwriting a description that was never used");
        }
    }

    pub(crate) fn take(&mut self) -> Option<String> {
        self.text.take()
    }

    /// Logs a description left over at the end of `scope`.
    pub(crate) fn finish(&mut self, scope: &str) {
        if let Some(unused) = self.text.take() {
            warn!(scope, description = %unused, "Description was never attached to a declaration");
        }
    }
}

/// Removes the indentation common to all non-blank lines, and leading and
/// trailing blank lines.
#[must_use]
pub fn trim_indent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |i| i + 1);
    let lines = &lines[start..end];
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A description from the DSL wins over a reflected one.
pub(crate) fn pick(dsl: Option<String>, reflected: Option<String>) -> Option<String> {
    dsl.or(reflected)
}
