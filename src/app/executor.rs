//! Runs compiled searches against a server

use url::Url;

use crate::app::client::{ClientConfig, HttpHandler};
use crate::app::models::{ResultBundle, ServerProfile};
use crate::app::query::CompiledQuery;
use crate::auth::AuthStrategy;
use crate::errors::{ExecutionError, ExecutionResult, Result};

/// Executes compiled queries with the server's credentials
///
/// Each call is a single GET; there is no retry or paging.
#[derive(Debug)]
pub struct QueryExecutor {
    http_handler: HttpHandler,
}

impl QueryExecutor {
    /// # Errors
    ///
    /// Returns `AppError` if the HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            http_handler: HttpHandler::from_config(&config)?,
        })
    }

    /// Run `query` against `server` and decode the search bundle
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` if:
    /// - The compiled URL does not parse
    /// - Credentials cannot be turned into headers
    /// - The request cannot be sent or times out
    /// - The server answers with a non-2xx status (the body is not read)
    /// - The body is not JSON
    pub async fn execute(
        &self,
        query: &CompiledQuery,
        server: &ServerProfile,
    ) -> ExecutionResult<ResultBundle> {
        let raw_url = query.url();
        let url = Url::parse(&raw_url).map_err(|e| ExecutionError::InvalidUrl {
            url: raw_url.clone(),
            reason: e.to_string(),
        })?;
        let headers = AuthStrategy::headers_for(server)?;

        tracing::info!("Executing query: {}", raw_url);
        let response = self
            .http_handler
            .get(&url, headers)
            .await
            .map_err(|source| ExecutionError::Transport {
                url: raw_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Query failed with HTTP {}: {}", status.as_u16(), raw_url);
            return Err(ExecutionError::QueryFailed {
                status: status.as_u16(),
                url: raw_url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ExecutionError::Transport {
                url: raw_url.clone(),
                source,
            })?;
        let bundle: ResultBundle =
            serde_json::from_str(&body).map_err(|source| ExecutionError::Decode {
                url: raw_url,
                source,
            })?;

        tracing::debug!(
            "Query returned {} entries (total {:?})",
            bundle.entry_count(),
            bundle.total
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::query::{QueryCompiler, QueryModel};

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let executor = QueryExecutor::new(ClientConfig::default()).unwrap();
        let server = ServerProfile::new("Local", &format!("http://127.0.0.1:{}", port)).unwrap();
        let query =
            QueryCompiler::compile(&QueryModel::for_resource("Patient"), Some(&server)).unwrap();

        let error = executor.execute(&query, &server).await.unwrap_err();
        assert!(matches!(error, ExecutionError::Transport { .. }));
        assert_eq!(error.status(), None);
    }
}
