//! Turning `[[sources]]` configuration into live sources.

use std::sync::Arc;
use std::time::Duration;

use depot_core::config::{DepotConfig, SourceKind};
use depot_util::errors::DepotError;
use depot_util::fs::expand_home;
use reqwest::Client;

use crate::http::{self, HttpSource};
use crate::local::LocalSource;
use crate::source::PackageSource;

/// Build the enabled sources in query order.
///
/// All HTTP sources share one client.
pub fn build_sources(config: &DepotConfig) -> miette::Result<Vec<Arc<dyn PackageSource>>> {
    let enabled = config.enabled_sources();
    let mut shared_client: Option<Client> = None;

    let mut sources: Vec<Arc<dyn PackageSource>> = Vec::with_capacity(enabled.len());
    for entry in enabled {
        let timeout = Duration::from_millis(config.source_timeout_ms(entry));
        let source: Arc<dyn PackageSource> = match entry.kind {
            SourceKind::Local => Arc::new(LocalSource::new(
                &entry.name,
                expand_home(&entry.location),
                timeout,
            )),
            SourceKind::Http => {
                if !entry.location.starts_with("http://") && !entry.location.starts_with("https://")
                {
                    return Err(DepotError::Config {
                        message: format!(
                            "source '{}' has kind = \"http\" but location '{}' is not an http(s) URL",
                            entry.name, entry.location
                        ),
                    }
                    .into());
                }
                let client = match shared_client {
                    Some(ref c) => c.clone(),
                    None => {
                        let c = http::build_client()?;
                        shared_client = Some(c.clone());
                        c
                    }
                };
                Arc::new(
                    HttpSource::new(&entry.name, &entry.location, timeout, client)
                        .with_token(entry.token.clone()),
                )
            }
        };
        tracing::debug!(
            "configured source '{}' ({:?}, timeout {}ms)",
            entry.name,
            entry.kind,
            timeout.as_millis()
        );
        sources.push(source);
    }
    Ok(sources)
}
