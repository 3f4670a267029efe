//! Search parameter catalog derived from a capability statement
//!
//! Only the first REST mode of a statement is consulted. Missing or malformed
//! structure never fails a lookup: it produces an empty (or partial) result
//! together with a [`CatalogDegradation`] describing what was wrong, so callers
//! can tell "this resource has no parameters" from "the statement was broken".

use std::fmt;

use tracing::warn;

use crate::app::models::{
    CapabilityDocument, ComparisonPrefix, ResourceDescriptor, SearchParamType,
    SearchParameterDefinition,
};

const NUMERIC_PREFIXES: &[ComparisonPrefix] = &[
    ComparisonPrefix::Eq,
    ComparisonPrefix::Ne,
    ComparisonPrefix::Gt,
    ComparisonPrefix::Lt,
    ComparisonPrefix::Ge,
    ComparisonPrefix::Le,
];

const DATE_PREFIXES: &[ComparisonPrefix] = &[
    ComparisonPrefix::Eq,
    ComparisonPrefix::Ne,
    ComparisonPrefix::Gt,
    ComparisonPrefix::Lt,
    ComparisonPrefix::Ge,
    ComparisonPrefix::Le,
    ComparisonPrefix::Sa,
    ComparisonPrefix::Eb,
];

/// Why a lookup returned less than a well-formed statement would have
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogDegradation {
    /// No usable `rest` array
    MissingRest,
    /// First REST mode has no usable `resource` array
    MissingResources,
    /// Resource type is not declared by the server
    ResourceNotDeclared,
    /// Resource is declared but its `searchParam` list is absent or malformed
    MissingSearchParams,
    /// Some parameter entries lacked a name or type and were skipped
    MalformedEntries { skipped: usize },
}

impl fmt::Display for CatalogDegradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRest => write!(f, "capability statement declares no REST mode"),
            Self::MissingResources => write!(f, "first REST mode declares no resources"),
            Self::ResourceNotDeclared => write!(f, "resource type is not declared by the server"),
            Self::MissingSearchParams => write!(f, "resource declares no search parameters"),
            Self::MalformedEntries { skipped } => {
                write!(f, "{} malformed search parameter entries skipped", skipped)
            }
        }
    }
}

/// Result of a catalog lookup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogLookup {
    /// Legal parameters in document order
    pub parameters: Vec<SearchParameterDefinition>,
    /// Set when the statement was missing structure along the way
    pub degradation: Option<CatalogDegradation>,
}

impl CatalogLookup {
    fn degraded(degradation: CatalogDegradation) -> Self {
        Self {
            parameters: Vec::new(),
            degradation: Some(degradation),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }

    /// Definition for `name`, if declared
    pub fn find(&self, name: &str) -> Option<&SearchParameterDefinition> {
        find_parameter(&self.parameters, name)
    }
}

/// Derives legal search parameters from capability statements
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterCatalog;

impl ParameterCatalog {
    /// Declared search parameters for `resource_type`, in document order
    pub fn parameters_for(
        document: &CapabilityDocument,
        resource_type: &str,
    ) -> Vec<SearchParameterDefinition> {
        Self::lookup(document, resource_type).parameters
    }

    /// Declared search parameters plus a diagnostic when structure was missing
    pub fn lookup(document: &CapabilityDocument, resource_type: &str) -> CatalogLookup {
        let resources = match first_rest_resources(document) {
            Ok(resources) => resources,
            Err(degradation) => {
                warn!("Catalog lookup for {} degraded: {}", resource_type, degradation);
                return CatalogLookup::degraded(degradation);
            }
        };

        let Some(descriptor) = resources
            .iter()
            .find(|r| r.resource_type.as_deref() == Some(resource_type))
        else {
            return CatalogLookup::degraded(CatalogDegradation::ResourceNotDeclared);
        };

        let Some(declared) = descriptor.search_param.as_ref() else {
            return CatalogLookup::degraded(CatalogDegradation::MissingSearchParams);
        };

        let mut skipped = 0;
        let parameters: Vec<_> = declared
            .iter()
            .filter_map(|param| {
                let definition = match (param.name.as_deref(), param.param_type.as_deref()) {
                    (Some(name), Some(code)) if !name.is_empty() => SearchParameterDefinition {
                        name: name.to_string(),
                        param_type: SearchParamType::from_code(code),
                        documentation: param.documentation.clone(),
                    },
                    _ => {
                        skipped += 1;
                        return None;
                    }
                };
                Some(definition)
            })
            .collect();

        let degradation = (skipped > 0).then_some(CatalogDegradation::MalformedEntries { skipped });
        if let Some(ref degradation) = degradation {
            warn!("Catalog lookup for {} degraded: {}", resource_type, degradation);
        }

        CatalogLookup {
            parameters,
            degradation,
        }
    }

    /// Resource types declared by the first REST mode, in document order
    pub fn resource_types(document: &CapabilityDocument) -> Vec<String> {
        first_rest_resources(document)
            .map(|resources| {
                resources
                    .iter()
                    .filter_map(|r| r.resource_type.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Comparison prefixes legal for a semantic type; empty means no prefix control
    pub fn prefixes_for(param_type: SearchParamType) -> &'static [ComparisonPrefix] {
        match param_type {
            SearchParamType::Number | SearchParamType::Quantity => NUMERIC_PREFIXES,
            SearchParamType::Date => DATE_PREFIXES,
            _ => &[],
        }
    }

    /// Whether `prefix` may be used with `param_type`
    pub fn allows_prefix(param_type: SearchParamType, prefix: ComparisonPrefix) -> bool {
        Self::prefixes_for(param_type).contains(&prefix)
    }
}

/// Definition for `name` within a parameter list
pub fn find_parameter<'a>(
    parameters: &'a [SearchParameterDefinition],
    name: &str,
) -> Option<&'a SearchParameterDefinition> {
    parameters.iter().find(|p| p.name == name)
}

fn first_rest_resources(
    document: &CapabilityDocument,
) -> Result<&[ResourceDescriptor], CatalogDegradation> {
    let rest = document
        .rest
        .as_ref()
        .and_then(|modes| modes.first())
        .ok_or(CatalogDegradation::MissingRest)?;

    rest.resource
        .as_deref()
        .ok_or(CatalogDegradation::MissingResources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: serde_json::Value) -> CapabilityDocument {
        serde_json::from_value(value).unwrap()
    }

    fn hapi_like() -> CapabilityDocument {
        document(json!({
            "resourceType": "CapabilityStatement",
            "status": "active",
            "rest": [
                {
                    "mode": "server",
                    "resource": [
                        {
                            "type": "Patient",
                            "searchParam": [
                                {"name": "birthdate", "type": "date", "documentation": "The patient's date of birth"},
                                {"name": "name", "type": "string"},
                                {"name": "identifier", "type": "token"}
                            ]
                        },
                        {"type": "Observation", "searchParam": [{"name": "value-quantity", "type": "quantity"}]},
                        {"type": "Group"}
                    ]
                },
                {
                    "mode": "client",
                    "resource": [{"type": "Device", "searchParam": [{"name": "udi", "type": "string"}]}]
                }
            ]
        }))
    }

    #[test]
    fn test_parameters_in_document_order() {
        let params = ParameterCatalog::parameters_for(&hapi_like(), "Patient");
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["birthdate", "name", "identifier"]);
        assert_eq!(params[0].param_type, SearchParamType::Date);
        assert_eq!(
            params[0].documentation.as_deref(),
            Some("The patient's date of birth")
        );
    }

    #[test]
    fn test_resource_match_is_case_sensitive() {
        let lookup = ParameterCatalog::lookup(&hapi_like(), "patient");
        assert!(lookup.parameters.is_empty());
        assert_eq!(
            lookup.degradation,
            Some(CatalogDegradation::ResourceNotDeclared)
        );
    }

    #[test]
    fn test_only_first_rest_mode_consulted() {
        assert!(ParameterCatalog::parameters_for(&hapi_like(), "Device").is_empty());
    }

    #[test]
    fn test_no_rest_array_returns_empty() {
        let doc = document(json!({"resourceType": "CapabilityStatement"}));
        let lookup = ParameterCatalog::lookup(&doc, "Patient");
        assert!(lookup.parameters.is_empty());
        assert_eq!(lookup.degradation, Some(CatalogDegradation::MissingRest));

        let doc = document(json!({"rest": []}));
        assert_eq!(
            ParameterCatalog::lookup(&doc, "Patient").degradation,
            Some(CatalogDegradation::MissingRest)
        );
    }

    #[test]
    fn test_missing_nested_structure_degrades() {
        let doc = document(json!({"rest": [{"mode": "server"}]}));
        assert_eq!(
            ParameterCatalog::lookup(&doc, "Patient").degradation,
            Some(CatalogDegradation::MissingResources)
        );

        let lookup = ParameterCatalog::lookup(&hapi_like(), "Group");
        assert!(lookup.parameters.is_empty());
        assert_eq!(
            lookup.degradation,
            Some(CatalogDegradation::MissingSearchParams)
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped_and_reported() {
        let doc = document(json!({
            "rest": [{"resource": [{"type": "Patient", "searchParam": [
                {"name": "gender", "type": "token"},
                {"type": "string"},
                {"name": "", "type": "string"},
                {"name": "phonetic"}
            ]}]}]
        }));
        let lookup = ParameterCatalog::lookup(&doc, "Patient");
        assert_eq!(lookup.parameters.len(), 1);
        assert_eq!(lookup.parameters[0].name, "gender");
        assert_eq!(
            lookup.degradation,
            Some(CatalogDegradation::MalformedEntries { skipped: 3 })
        );
    }

    #[test]
    fn test_wrongly_shaped_param_element_is_skipped() {
        let doc = document(json!({
            "rest": [{"resource": [{"type": "Patient", "searchParam": [
                {"name": "birthdate", "type": "date"},
                null,
                "garbage"
            ]}]}]
        }));
        let lookup = ParameterCatalog::lookup(&doc, "Patient");
        assert_eq!(lookup.parameters.len(), 1);
        assert_eq!(lookup.parameters[0].name, "birthdate");
        assert_eq!(
            lookup.degradation,
            Some(CatalogDegradation::MalformedEntries { skipped: 2 })
        );
    }

    #[test]
    fn test_wrongly_shaped_resource_element_keeps_the_rest() {
        let doc = document(json!({
            "rest": [{"resource": [
                {"type": "Patient", "searchParam": [{"name": "name", "type": "string"}]},
                "garbage",
                {"type": "Observation"}
            ]}]
        }));
        assert_eq!(
            ParameterCatalog::resource_types(&doc),
            vec!["Patient", "Observation"]
        );
        assert_eq!(ParameterCatalog::parameters_for(&doc, "Patient").len(), 1);
    }

    #[test]
    fn test_wrongly_shaped_rest_element_is_dropped() {
        let doc = document(json!({
            "rest": [42, {"mode": "server", "resource": [{"type": "Patient"}]}]
        }));
        assert_eq!(ParameterCatalog::resource_types(&doc), vec!["Patient"]);
    }

    #[test]
    fn test_well_formed_lookup_not_degraded() {
        let lookup = ParameterCatalog::lookup(&hapi_like(), "Observation");
        assert!(!lookup.is_degraded());
        assert_eq!(
            lookup.find("value-quantity").map(|p| p.param_type),
            Some(SearchParamType::Quantity)
        );
        assert!(lookup.find("missing").is_none());
    }

    #[test]
    fn test_resource_types() {
        assert_eq!(
            ParameterCatalog::resource_types(&hapi_like()),
            vec!["Patient", "Observation", "Group"]
        );
        assert!(ParameterCatalog::resource_types(&CapabilityDocument::default()).is_empty());
    }

    #[test]
    fn test_prefix_table() {
        use ComparisonPrefix as P;

        let numeric = [P::Eq, P::Ne, P::Gt, P::Lt, P::Ge, P::Le];
        assert_eq!(ParameterCatalog::prefixes_for(SearchParamType::Number), &numeric);
        assert_eq!(ParameterCatalog::prefixes_for(SearchParamType::Quantity), &numeric);
        assert_eq!(
            ParameterCatalog::prefixes_for(SearchParamType::Date),
            &[P::Eq, P::Ne, P::Gt, P::Lt, P::Ge, P::Le, P::Sa, P::Eb]
        );
        for other in [
            SearchParamType::String,
            SearchParamType::Token,
            SearchParamType::Reference,
            SearchParamType::Uri,
            SearchParamType::Unknown,
        ] {
            assert!(ParameterCatalog::prefixes_for(other).is_empty());
        }

        assert!(ParameterCatalog::allows_prefix(SearchParamType::Date, P::Sa));
        assert!(!ParameterCatalog::allows_prefix(SearchParamType::Number, P::Sa));
    }
}
