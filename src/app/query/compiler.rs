//! Renders a [`QueryModel`] into a FHIR search URL
//!
//! Rendering is pure: the same model and server always produce the same
//! string. Segments appear in this order:
//!
//! 1. parameter bindings, in model order, skipping incomplete ones
//! 2. `_include`, then `_revinclude` directives
//! 3. `_sort`
//! 4. `_count`, then `_offset`
//!
//! Values are percent-encoded; parameter names and modifiers are not.

use std::fmt;

use urlencoding::encode;

use crate::app::catalog::ParameterCatalog;
use crate::app::models::ServerProfile;
use crate::constants::fhir::{
    COUNT_PARAM, INCLUDE_PARAM, OFFSET_PARAM, PREFIX_SEPARATOR, REV_INCLUDE_PARAM, SORT_PARAM,
};

use super::model::{Include, ParameterBinding, QueryModel, SortOrder};

/// A rendered search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    path: String,
    query: String,
}

impl CompiledQuery {
    /// `{base}/{resourceType}`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string without the leading `?`; empty when nothing was rendered
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Full URL; `?` is present only when a query segment was rendered
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Turns query models into request URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler;

impl QueryCompiler {
    /// Render `model` against `server`
    ///
    /// Returns `None` while the query is not ready to run: no server selected
    /// or no resource type chosen.
    pub fn compile(model: &QueryModel, server: Option<&ServerProfile>) -> Option<CompiledQuery> {
        let server = server?;
        if model.resource_type().is_empty() {
            return None;
        }

        let path = format!(
            "{}/{}",
            server.base_url().trim_end_matches('/'),
            model.resource_type()
        );

        let mut segments: Vec<String> = model
            .parameters()
            .iter()
            .filter_map(render_binding)
            .collect();

        segments.extend(
            model
                .includes()
                .iter()
                .map(|i| format!("{}={}", INCLUDE_PARAM, render_include(i))),
        );
        segments.extend(
            model
                .rev_includes()
                .iter()
                .map(|i| format!("{}={}", REV_INCLUDE_PARAM, render_include(i))),
        );

        if !model.sorting().is_empty() {
            let keys: Vec<String> = model
                .sorting()
                .iter()
                .map(|s| match s.order {
                    SortOrder::Asc => encode(&s.parameter).into_owned(),
                    SortOrder::Desc => format!("-{}", encode(&s.parameter)),
                })
                .collect();
            segments.push(format!("{}={}", SORT_PARAM, keys.join(",")));
        }

        let pagination = model.pagination();
        if let Some(count) = pagination.count {
            segments.push(format!("{}={}", COUNT_PARAM, count));
        }
        if let Some(offset) = pagination.offset {
            segments.push(format!("{}={}", OFFSET_PARAM, offset));
        }

        let compiled = CompiledQuery {
            path,
            query: segments.join("&"),
        };
        tracing::debug!("Compiled query: {}", compiled);
        Some(compiled)
    }
}

fn render_binding(binding: &ParameterBinding) -> Option<String> {
    if !binding.is_complete() {
        return None;
    }

    let key = match binding.modifier().filter(|m| !m.is_empty()) {
        Some(modifier) => format!("{}:{}", binding.name(), modifier),
        None => binding.name().to_string(),
    };

    // Bindings keep their prefix legal, but never emit one the type rejects
    let prefix = binding
        .prefix()
        .filter(|p| ParameterCatalog::allows_prefix(binding.param_type(), *p));

    let value = match prefix {
        Some(prefix) => {
            encode(&format!("{}{}{}", prefix, PREFIX_SEPARATOR, binding.value())).into_owned()
        }
        None => encode(binding.value()).into_owned(),
    };

    Some(format!("{}={}", key, value))
}

fn render_include(include: &Include) -> String {
    format!(
        "{}:{}",
        encode(&include.resource),
        encode(&include.search_param)
    )
}
