//! Command handlers for the FHIR query builder CLI
//!
//! Each handler builds what it needs from the loaded [`AppConfig`], performs
//! the command, and prints results to stdout. Diagnostics go through tracing.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::app::{
    CapabilityCache, CapabilityClient, CapabilityDocument, ClientConfig, ComparisonPrefix,
    ParameterCatalog, ParameterUpdate, Pagination, QueryCompiler, QueryExecutor, QueryModel,
    ResultBundle, SearchParameterDefinition, ServerProfile, ServerRegistry,
};
use crate::auth::prompt_missing_password;
use crate::config::AppConfig;
use crate::constants::fhir::PREFIX_SEPARATOR;
use crate::errors::{AppError, Result};

use super::args::{CapabilitiesArgs, ParamArg, ParamsArgs, QueryArgs};

/// Registry and clients for one CLI invocation
struct Session {
    registry: ServerRegistry,
    client_config: ClientConfig,
    capabilities: CapabilityClient,
}

impl Session {
    fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = config.registry()?;
        let (client_config, cache_config) = config.to_runtime_config();
        let cache = Arc::new(CapabilityCache::new(cache_config));
        let capabilities = CapabilityClient::new(client_config.clone(), cache)?;
        Ok(Self {
            registry,
            client_config,
            capabilities,
        })
    }

    /// Selected server with any missing password filled in interactively
    fn server(&self, selector: Option<&str>) -> Result<ServerProfile> {
        let server = match selector {
            Some(key) => self.registry.find(key)?,
            None => self.registry.active().ok_or_else(|| {
                AppError::generic("No servers configured. Run `init` or add [[servers]] to the config file")
            })?,
        };

        let mut server = server.clone();
        let auth = prompt_missing_password(server.name(), server.auth().clone())?;
        server.set_auth(auth);
        Ok(server)
    }

    async fn fetch_with_spinner(
        &self,
        server: &ServerProfile,
        force_refresh: bool,
    ) -> Result<Arc<CapabilityDocument>> {
        let spinner = spinner(format!("Reading capabilities of {}...", server.name()));
        let result = self.capabilities.fetch_capabilities(server, force_refresh).await;
        spinner.finish_and_clear();
        Ok(result?)
    }
}

/// List registered servers
pub fn handle_servers(config: &AppConfig) -> Result<()> {
    let registry = config.registry()?;
    if registry.is_empty() {
        println!("No servers configured.");
        return Ok(());
    }

    let active = registry.active().map(|s| s.id().clone());
    for server in registry.iter() {
        let marker = if Some(server.id()) == active.as_ref() { "*" } else { " " };
        println!(
            "{} {:<20} {:<28} {} [{}, auth: {}]",
            marker,
            server.id().as_str(),
            server.name(),
            server.base_url(),
            server.version(),
            server.auth().kind()
        );
    }
    Ok(())
}

/// Summarize a server's capability statement
pub async fn handle_capabilities(config: &AppConfig, args: CapabilitiesArgs) -> Result<()> {
    let session = Session::from_config(config)?;
    let server = session.server(args.server.as_deref())?;
    let document = session.fetch_with_spinner(&server, args.refresh).await?;

    println!("Server:       {} ({})", server.name(), server.base_url());
    println!("Status:       {}", document.status.as_deref().unwrap_or("unknown"));
    println!("Date:         {}", document.date.as_deref().unwrap_or("unknown"));
    println!(
        "FHIR version: {}",
        document.fhir_version.as_deref().unwrap_or("unknown")
    );

    let resource_types = CapabilityClient::resource_types(&document);
    println!("Resource types ({}):", resource_types.len());
    for resource_type in resource_types {
        println!("  {}", resource_type);
    }
    Ok(())
}

/// List the search parameters declared for a resource type
pub async fn handle_params(config: &AppConfig, args: ParamsArgs) -> Result<()> {
    let session = Session::from_config(config)?;
    let server = session.server(args.server.as_deref())?;
    let document = session.fetch_with_spinner(&server, false).await?;

    let lookup = ParameterCatalog::lookup(&document, &args.resource);
    if let Some(ref degradation) = lookup.degradation {
        println!("Note: {}", degradation);
    }
    if lookup.parameters.is_empty() {
        println!("No search parameters available for {}", args.resource);
        return Ok(());
    }

    println!("Search parameters for {}:", args.resource);
    for param in &lookup.parameters {
        let prefixes: Vec<&str> = ParameterCatalog::prefixes_for(param.param_type)
            .iter()
            .map(ComparisonPrefix::code)
            .collect();
        let prefixes = if prefixes.is_empty() {
            "-".to_string()
        } else {
            prefixes.join(",")
        };
        println!(
            "  {:<28} {:<10} {:<24} {}",
            param.name,
            param.param_type.as_str(),
            prefixes,
            param.documentation.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Compile a query, print its URL, and optionally run it
pub async fn handle_query(config: &AppConfig, args: QueryArgs) -> Result<()> {
    let session = Session::from_config(config)?;
    let server = session.server(args.server.as_deref())?;

    // Parameter types only refine prefix handling; preview still works without them
    let catalog = match session.fetch_with_spinner(&server, false).await {
        Ok(document) => ParameterCatalog::parameters_for(&document, &args.resource),
        Err(e) => {
            warn!("Could not read capabilities, parameter types unknown: {}", e);
            Vec::new()
        }
    };

    let model = build_model(&args, &catalog)?;
    if !catalog.is_empty() {
        for index in model.stale_bindings(&catalog) {
            warn!(
                "{} does not declare search parameter '{}' for {}",
                server.name(),
                model.parameters()[index].name(),
                args.resource
            );
        }
    }

    let query = QueryCompiler::compile(&model, Some(&server))
        .ok_or_else(|| AppError::generic("A resource type is required"))?;
    println!("{}", query);

    if !args.execute {
        return Ok(());
    }

    let executor = QueryExecutor::new(session.client_config.clone())?;
    let spinner = spinner(format!("Running query against {}...", server.name()));
    let result = executor.execute(&query, &server).await;
    spinner.finish_and_clear();
    let bundle = result?;

    info!("Query returned {} entries", bundle.entry_count());
    if args.raw {
        let json = serde_json::to_string_pretty(&bundle)
            .map_err(|e| AppError::generic(format!("Failed to render bundle: {}", e)))?;
        println!("{}", json);
    } else {
        print_bundle_summary(&bundle);
    }
    Ok(())
}

/// Write the default configuration file
pub async fn handle_init() -> Result<()> {
    let (path, created) = AppConfig::initialize_first_run().await?;
    if created {
        println!("Created default configuration file:");
        println!("   {}", path.display());
        println!("   You can customize settings by editing this file.");
    } else {
        println!("Configuration file already exists: {}", path.display());
    }
    Ok(())
}

/// Turn command-line criteria into a query model
///
/// Names are resolved against `catalog`; a `{prefix}|{value}` value is split
/// only when the parameter's type accepts that prefix.
fn build_model(args: &QueryArgs, catalog: &[SearchParameterDefinition]) -> Result<QueryModel> {
    let mut model = QueryModel::for_resource(args.resource.clone());

    for param in &args.params {
        let index = model.add_parameter();
        model.update_parameter(index, ParameterUpdate::Name(param.name.clone()), catalog)?;
        model.update_parameter(index, ParameterUpdate::Modifier(param.modifier.clone()), catalog)?;

        let param_type = model.parameters()[index].param_type();
        let (prefix, value) = split_prefix(param, |p| ParameterCatalog::allows_prefix(param_type, p));
        model.update_parameter(index, ParameterUpdate::Prefix(prefix), catalog)?;
        model.update_parameter(index, ParameterUpdate::Value(value), catalog)?;
    }

    for include in &args.include {
        model.add_include(include.clone());
    }
    for include in &args.revinclude {
        model.add_rev_include(include.clone());
    }
    for sort in &args.sort {
        model.add_sort(sort.clone());
    }
    model.set_pagination(Pagination {
        count: args.count,
        offset: args.offset,
    });

    Ok(model)
}

fn split_prefix(
    param: &ParamArg,
    allowed: impl Fn(ComparisonPrefix) -> bool,
) -> (Option<ComparisonPrefix>, String) {
    if let Some((code, rest)) = param.value.split_once(PREFIX_SEPARATOR) {
        if let Ok(prefix) = code.parse::<ComparisonPrefix>() {
            if allowed(prefix) {
                return (Some(prefix), rest.to_string());
            }
        }
    }
    (None, param.value.clone())
}

fn print_bundle_summary(bundle: &ResultBundle) {
    match bundle.total {
        Some(total) => println!("Total matches: {}", total),
        None => println!("Total matches: not reported"),
    }
    println!("Entries in this page: {}", bundle.entry_count());
    for resource in bundle.resources() {
        let resource_type = resource
            .get("resourceType")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        let id = resource.get("id").and_then(|v| v.as_str()).unwrap_or("?");
        println!("  {}/{}", resource_type, id);
    }
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["◐", "◓", "◑", "◒"]);
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{SearchParamType, SortOption};

    fn args(params: Vec<ParamArg>) -> QueryArgs {
        QueryArgs {
            server: None,
            resource: "Patient".to_string(),
            params,
            include: Vec::new(),
            revinclude: Vec::new(),
            sort: Vec::new(),
            count: None,
            offset: None,
            execute: false,
            raw: false,
        }
    }

    fn param(name: &str, value: &str) -> ParamArg {
        ParamArg {
            name: name.to_string(),
            modifier: None,
            value: value.to_string(),
        }
    }

    fn catalog() -> Vec<SearchParameterDefinition> {
        vec![
            SearchParameterDefinition::new("birthdate", SearchParamType::Date),
            SearchParameterDefinition::new("identifier", SearchParamType::Token),
        ]
    }

    #[test]
    fn test_prefix_split_for_date_parameter() {
        let model = build_model(&args(vec![param("birthdate", "ge|1990-01-01")]), &catalog()).unwrap();
        let binding = &model.parameters()[0];
        assert_eq!(binding.prefix(), Some(ComparisonPrefix::Ge));
        assert_eq!(binding.value(), "1990-01-01");

        let server = ServerProfile::new("HAPI", "https://hapi.fhir.org/baseR4").unwrap();
        let query = QueryCompiler::compile(&model, Some(&server)).unwrap();
        assert_eq!(
            query.url(),
            "https://hapi.fhir.org/baseR4/Patient?birthdate=ge%7C1990-01-01"
        );
    }

    #[test]
    fn test_token_value_with_pipe_is_not_split() {
        let model = build_model(&args(vec![param("identifier", "eq|123")]), &catalog()).unwrap();
        let binding = &model.parameters()[0];
        assert_eq!(binding.prefix(), None);
        assert_eq!(binding.value(), "eq|123");
    }

    #[test]
    fn test_unknown_parameter_keeps_value_verbatim() {
        let model = build_model(&args(vec![param("_lastUpdated", "gt|2024")]), &[]).unwrap();
        let binding = &model.parameters()[0];
        assert_eq!(binding.param_type(), SearchParamType::String);
        assert_eq!(binding.prefix(), None);
        assert_eq!(model.stale_bindings(&catalog()), vec![0]);
    }

    #[test]
    fn test_directives_copied_into_model() {
        let mut query_args = args(Vec::new());
        query_args.sort = vec![SortOption::descending("birthdate")];
        query_args.count = Some(5);

        let model = build_model(&query_args, &catalog()).unwrap();
        assert_eq!(model.sorting(), &[SortOption::descending("birthdate")]);
        assert_eq!(model.pagination().count, Some(5));
        assert_eq!(model.pagination().offset, None);
    }
}
