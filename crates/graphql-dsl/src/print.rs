//! SDL rendering for diagnostics.

use async_graphql::SDLExportOptions;

/// How [`SchemaGraph::print`](crate::SchemaGraph::print) renders the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    pub sorted_fields: bool,
    pub sorted_enum_values: bool,
    /// Print short descriptions as `"text"` instead of block strings.
    pub single_line_descriptions: bool,
}

impl PrintOptions {
    /// Sorted fields and enum values with single-line descriptions, which
    /// keeps the output stable across declaration order.
    #[must_use]
    pub fn stable() -> Self {
        Self {
            sorted_fields: true,
            sorted_enum_values: true,
            single_line_descriptions: true,
        }
    }

    pub(crate) fn export_options(&self) -> SDLExportOptions {
        let mut options = SDLExportOptions::new();
        if self.sorted_fields {
            options = options.sorted_fields();
        }
        if self.sorted_enum_values {
            options = options.sorted_enum_items();
        }
        if self.single_line_descriptions {
            options = options.prefer_single_line_descriptions();
        }
        options
    }
}
