//! Structured representation of an in-progress search
//!
//! The model is edited through explicit operations only. It does not know about
//! capability statements; operations that need declared parameter types take
//! the current catalog as an argument.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::catalog::{find_parameter, ParameterCatalog};
use crate::app::models::{ComparisonPrefix, SearchParamType, SearchParameterDefinition};
use crate::errors::{QueryError, QueryResult};

/// One user-specified search criterion
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterBinding {
    name: String,
    value: String,
    param_type: SearchParamType,
    prefix: Option<ComparisonPrefix>,
    modifier: Option<String>,
}

impl ParameterBinding {
    /// Binding with a name and value, typed as `string` with no prefix
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Binding typed from a catalog definition
    pub fn from_definition(definition: &SearchParameterDefinition, value: impl Into<String>) -> Self {
        Self::new(definition.name.clone(), value).with_type(definition.param_type)
    }

    /// Set the semantic type; drops a prefix the new type does not allow
    pub fn with_type(mut self, param_type: SearchParamType) -> Self {
        self.retype(param_type);
        self
    }

    /// Set the comparison prefix
    ///
    /// # Errors
    ///
    /// Returns `QueryError::PrefixNotAllowed` if the binding's type does not
    /// accept `prefix`.
    pub fn with_prefix(mut self, prefix: ComparisonPrefix) -> QueryResult<Self> {
        self.set_prefix(Some(prefix))?;
        Ok(self)
    }

    /// Set a modifier such as `exact` or `missing`
    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn param_type(&self) -> SearchParamType {
        self.param_type
    }

    pub fn prefix(&self) -> Option<ComparisonPrefix> {
        self.prefix
    }

    pub fn modifier(&self) -> Option<&str> {
        self.modifier.as_deref()
    }

    /// Both name and value are filled in
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.value.is_empty()
    }

    fn set_prefix(&mut self, prefix: Option<ComparisonPrefix>) -> QueryResult<()> {
        if let Some(prefix) = prefix {
            if !ParameterCatalog::allows_prefix(self.param_type, prefix) {
                return Err(QueryError::PrefixNotAllowed {
                    prefix: prefix.to_string(),
                    param_type: self.param_type.to_string(),
                });
            }
        }
        self.prefix = prefix;
        Ok(())
    }

    fn retype(&mut self, param_type: SearchParamType) {
        self.param_type = param_type;
        if let Some(prefix) = self.prefix {
            if !ParameterCatalog::allows_prefix(param_type, prefix) {
                debug!(
                    "Dropping prefix {} from {}: not valid for {} parameters",
                    prefix, self.name, param_type
                );
                self.prefix = None;
            }
        }
    }
}

/// A single-field edit to a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterUpdate {
    /// Rename; the semantic type is re-resolved from the catalog
    Name(String),
    Value(String),
    Prefix(Option<ComparisonPrefix>),
    Modifier(Option<String>),
}

/// `_include` / `_revinclude` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    pub resource: String,
    pub search_param: String,
}

impl Include {
    pub fn new(resource: impl Into<String>, search_param: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            search_param: search_param.into(),
        }
    }

    /// Parse `Resource:param`
    pub fn parse(raw: &str) -> Option<Self> {
        let (resource, search_param) = raw.split_once(':')?;
        if resource.is_empty() || search_param.is_empty() {
            return None;
        }
        Some(Self::new(resource, search_param))
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.search_param)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// `_sort` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOption {
    pub parameter: String,
    pub order: SortOrder,
}

impl SortOption {
    pub fn ascending(parameter: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn descending(parameter: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            order: SortOrder::Desc,
        }
    }

    /// Parse `param` or `-param`
    pub fn parse(raw: &str) -> Option<Self> {
        let sort = match raw.strip_prefix('-') {
            Some(parameter) => Self::descending(parameter),
            None => Self::ascending(raw),
        };
        (!sort.parameter.is_empty()).then_some(sort)
    }
}

/// Page size and offset settings; traversal of further pages is not modelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub count: Option<u32>,
    pub offset: Option<u32>,
}

/// The query under construction in one editing session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryModel {
    resource_type: String,
    parameters: Vec<ParameterBinding>,
    includes: Vec<Include>,
    rev_includes: Vec<Include>,
    sorting: Vec<SortOption>,
    pagination: Pagination,
}

impl QueryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model targeting `resource_type` with no parameters
    pub fn for_resource(resource_type: impl Into<String>) -> Self {
        let mut model = Self::new();
        model.set_resource_type(resource_type);
        model
    }

    /// Replace the resource type
    ///
    /// Existing bindings are kept; the caller re-derives the catalog and can
    /// use [`QueryModel::stale_bindings`] to find bindings it no longer declares.
    pub fn set_resource_type(&mut self, resource_type: impl Into<String>) {
        self.resource_type = resource_type.into();
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn parameters(&self) -> &[ParameterBinding] {
        &self.parameters
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    pub fn rev_includes(&self) -> &[Include] {
        &self.rev_includes
    }

    pub fn sorting(&self) -> &[SortOption] {
        &self.sorting
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Append an empty `string` binding and return its index
    pub fn add_parameter(&mut self) -> usize {
        self.push_parameter(ParameterBinding::default())
    }

    /// Append a prepared binding and return its index
    pub fn push_parameter(&mut self, binding: ParameterBinding) -> usize {
        self.parameters.push(binding);
        self.parameters.len() - 1
    }

    /// Apply a single-field edit to the binding at `index`
    ///
    /// A rename takes its semantic type from the matching `catalog` entry; an
    /// undeclared name keeps the current type.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::IndexOutOfBounds` for a bad index and
    /// `QueryError::PrefixNotAllowed` for a prefix the binding's type rejects.
    pub fn update_parameter(
        &mut self,
        index: usize,
        update: ParameterUpdate,
        catalog: &[SearchParameterDefinition],
    ) -> QueryResult<()> {
        let binding = self.binding_mut(index)?;
        match update {
            ParameterUpdate::Name(name) => {
                let resolved = find_parameter(catalog, &name).map(|d| d.param_type);
                binding.name = name;
                if let Some(param_type) = resolved {
                    binding.retype(param_type);
                }
            }
            ParameterUpdate::Value(value) => binding.value = value,
            ParameterUpdate::Prefix(prefix) => binding.set_prefix(prefix)?,
            ParameterUpdate::Modifier(modifier) => binding.modifier = modifier,
        }
        Ok(())
    }

    /// Replace the binding at `index` wholesale
    ///
    /// # Errors
    ///
    /// Returns `QueryError::IndexOutOfBounds` for a bad index.
    pub fn replace_parameter(&mut self, index: usize, binding: ParameterBinding) -> QueryResult<()> {
        *self.binding_mut(index)? = binding;
        Ok(())
    }

    /// Remove and return the binding at `index`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::IndexOutOfBounds` for a bad index.
    pub fn remove_parameter(&mut self, index: usize) -> QueryResult<ParameterBinding> {
        let len = self.parameters.len();
        if index >= len {
            return Err(QueryError::IndexOutOfBounds { index, len });
        }
        Ok(self.parameters.remove(index))
    }

    /// Indexes of named bindings that `catalog` does not declare
    pub fn stale_bindings(&self, catalog: &[SearchParameterDefinition]) -> Vec<usize> {
        self.parameters
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.name.is_empty() && find_parameter(catalog, &b.name).is_none())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn add_include(&mut self, include: Include) {
        self.includes.push(include);
    }

    pub fn add_rev_include(&mut self, include: Include) {
        self.rev_includes.push(include);
    }

    pub fn add_sort(&mut self, sort: SortOption) {
        self.sorting.push(sort);
    }

    pub fn set_pagination(&mut self, pagination: Pagination) {
        self.pagination = pagination;
    }

    /// Reset to an empty, unselected query
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn binding_mut(&mut self, index: usize) -> QueryResult<&mut ParameterBinding> {
        let len = self.parameters.len();
        self.parameters
            .get_mut(index)
            .ok_or(QueryError::IndexOutOfBounds { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient_catalog() -> Vec<SearchParameterDefinition> {
        vec![
            SearchParameterDefinition::new("birthdate", SearchParamType::Date),
            SearchParameterDefinition::new("name", SearchParamType::String),
            SearchParameterDefinition::new("general-practitioner", SearchParamType::Reference),
            SearchParameterDefinition::new("age", SearchParamType::Number),
        ]
    }

    #[test]
    fn test_add_parameter_appends_empty_string_binding() {
        let mut model = QueryModel::for_resource("Patient");
        let index = model.add_parameter();
        assert_eq!(index, 0);

        let binding = &model.parameters()[0];
        assert_eq!(binding.name(), "");
        assert_eq!(binding.value(), "");
        assert_eq!(binding.param_type(), SearchParamType::String);
        assert_eq!(binding.prefix(), None);
        assert!(!binding.is_complete());
    }

    #[test]
    fn test_rename_resolves_type_from_catalog() {
        let catalog = patient_catalog();
        let mut model = QueryModel::for_resource("Patient");
        model.add_parameter();

        model
            .update_parameter(0, ParameterUpdate::Name("birthdate".to_string()), &catalog)
            .unwrap();
        assert_eq!(model.parameters()[0].param_type(), SearchParamType::Date);
    }

    #[test]
    fn test_rename_to_unknown_keeps_type() {
        let catalog = patient_catalog();
        let mut model = QueryModel::for_resource("Patient");
        model.add_parameter();
        model
            .update_parameter(0, ParameterUpdate::Name("age".to_string()), &catalog)
            .unwrap();

        model
            .update_parameter(0, ParameterUpdate::Name("_custom".to_string()), &catalog)
            .unwrap();
        assert_eq!(model.parameters()[0].name(), "_custom");
        assert_eq!(model.parameters()[0].param_type(), SearchParamType::Number);
    }

    #[test]
    fn test_out_of_bounds_edits_fail() {
        let catalog = patient_catalog();
        let mut model = QueryModel::for_resource("Patient");
        model.add_parameter();

        assert_eq!(
            model.update_parameter(1, ParameterUpdate::Value("x".to_string()), &catalog),
            Err(QueryError::IndexOutOfBounds { index: 1, len: 1 })
        );
        assert_eq!(
            model.remove_parameter(5),
            Err(QueryError::IndexOutOfBounds { index: 5, len: 1 })
        );
        assert_eq!(
            model.replace_parameter(1, ParameterBinding::new("a", "b")),
            Err(QueryError::IndexOutOfBounds { index: 1, len: 1 })
        );
        assert_eq!(model.parameters().len(), 1);
    }

    #[test]
    fn test_remove_parameter_returns_binding() {
        let mut model = QueryModel::for_resource("Patient");
        model.push_parameter(ParameterBinding::new("a", "1"));
        model.push_parameter(ParameterBinding::new("b", "2"));

        let removed = model.remove_parameter(0).unwrap();
        assert_eq!(removed.name(), "a");
        assert_eq!(model.parameters().len(), 1);
        assert_eq!(model.parameters()[0].name(), "b");
    }

    #[test]
    fn test_prefix_rejected_for_non_comparable_types() {
        let catalog = patient_catalog();
        let mut model = QueryModel::for_resource("Patient");
        model.add_parameter();
        model
            .update_parameter(0, ParameterUpdate::Name("name".to_string()), &catalog)
            .unwrap();

        let result = model.update_parameter(
            0,
            ParameterUpdate::Prefix(Some(ComparisonPrefix::Ge)),
            &catalog,
        );
        assert!(matches!(result, Err(QueryError::PrefixNotAllowed { .. })));
        assert_eq!(model.parameters()[0].prefix(), None);

        assert!(ParameterBinding::new("code", "x")
            .with_type(SearchParamType::Token)
            .with_prefix(ComparisonPrefix::Eq)
            .is_err());
    }

    #[test]
    fn test_date_only_prefix_rejected_for_numbers() {
        let result = ParameterBinding::new("age", "30")
            .with_type(SearchParamType::Number)
            .with_prefix(ComparisonPrefix::Sa);
        assert!(matches!(result, Err(QueryError::PrefixNotAllowed { .. })));
    }

    #[test]
    fn test_rename_to_incompatible_type_clears_prefix() {
        let catalog = patient_catalog();
        let mut model = QueryModel::for_resource("Patient");
        model.add_parameter();
        model
            .update_parameter(0, ParameterUpdate::Name("birthdate".to_string()), &catalog)
            .unwrap();
        model
            .update_parameter(0, ParameterUpdate::Prefix(Some(ComparisonPrefix::Ge)), &catalog)
            .unwrap();
        assert_eq!(model.parameters()[0].prefix(), Some(ComparisonPrefix::Ge));

        model
            .update_parameter(0, ParameterUpdate::Name("name".to_string()), &catalog)
            .unwrap();
        assert_eq!(model.parameters()[0].param_type(), SearchParamType::String);
        assert_eq!(model.parameters()[0].prefix(), None);
    }

    #[test]
    fn test_resource_change_keeps_and_flags_bindings() {
        let patient = patient_catalog();
        let observation = vec![SearchParameterDefinition::new("code", SearchParamType::Token)];

        let mut model = QueryModel::for_resource("Patient");
        model.push_parameter(ParameterBinding::from_definition(&patient[0], "1990-01-01"));
        model.push_parameter(ParameterBinding::new("code", "1234-5"));
        model.add_parameter();
        assert!(model.stale_bindings(&patient).contains(&1));

        model.set_resource_type("Observation");
        assert_eq!(model.resource_type(), "Observation");
        assert_eq!(model.parameters().len(), 3);
        assert_eq!(model.stale_bindings(&observation), vec![0]);
    }

    #[test]
    fn test_directive_parsing() {
        assert_eq!(
            Include::parse("Observation:subject"),
            Some(Include::new("Observation", "subject"))
        );
        assert_eq!(Include::parse("Observation"), None);
        assert_eq!(Include::parse(":subject"), None);

        assert_eq!(SortOption::parse("-date"), Some(SortOption::descending("date")));
        assert_eq!(SortOption::parse("date"), Some(SortOption::ascending("date")));
        assert_eq!(SortOption::parse("-"), None);
        assert_eq!(SortOption::parse(""), None);
    }

    #[test]
    fn test_clear_resets_model() {
        let mut model = QueryModel::for_resource("Patient");
        model.add_parameter();
        model.add_sort(SortOption::ascending("name"));
        model.clear();
        assert_eq!(model, QueryModel::default());
    }
}
