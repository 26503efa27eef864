//! Concurrent fan-out of one operation to every configured source.
//!
//! Every source is queried at once, each under its own timeout, and the
//! outcomes are returned in the caller's source order regardless of which
//! source answered first. Dropping the future returned by [`query`] aborts
//! all in-flight source calls.

use std::future::Future;
use std::sync::Arc;

use depot_source::{PackageSource, SourceError};
use tokio::task::JoinSet;

/// What one source answered.
#[derive(Debug, Clone)]
pub struct SourceOutcome<T> {
    pub source_name: String,
    pub value: Option<T>,
    pub error: Option<SourceError>,
}

/// All answers of one fan-out burst, in declared source order.
#[derive(Debug, Clone)]
pub struct FanoutOutcome<T> {
    pub entries: Vec<SourceOutcome<T>>,
}

impl<T> FanoutOutcome<T> {
    /// The first value in declared source order, with the source it came from.
    pub fn first_value(&self) -> Option<(&str, &T)> {
        self.entries
            .iter()
            .find_map(|e| e.value.as_ref().map(|v| (e.source_name.as_str(), v)))
    }

    /// Consume the outcome, keeping the first value in declared order.
    pub fn into_first_value(self) -> Option<(String, T)> {
        self.entries
            .into_iter()
            .find_map(|e| e.value.map(|v| (e.source_name, v)))
    }

    pub fn errors(&self) -> impl Iterator<Item = &SourceError> {
        self.entries.iter().filter_map(|e| e.error.as_ref())
    }

    pub fn has_value(&self) -> bool {
        self.entries.iter().any(|e| e.value.is_some())
    }

    /// True when there was at least one source and every one of them errored.
    pub fn all_failed(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.error.is_some())
    }

    /// Every error joined into one diagnostic line, or `None` if none failed.
    pub fn joined_errors(&self) -> Option<String> {
        let parts: Vec<String> = self.errors().map(ToString::to_string).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Run `op` against every source concurrently and wait for all of them.
///
/// `Ok(None)` from a source means "not here" and is recorded as neither a
/// value nor an error. A timeout is recorded like any other source error.
pub async fn query<T, F, Fut>(sources: &[Arc<dyn PackageSource>], op: F) -> FanoutOutcome<T>
where
    T: Send + 'static,
    F: Fn(Arc<dyn PackageSource>) -> Fut,
    Fut: Future<Output = Result<Option<T>, SourceError>> + Send + 'static,
{
    let names: Vec<String> = sources.iter().map(|s| s.name().to_string()).collect();
    let mut slots: Vec<Option<Result<Option<T>, SourceError>>> =
        (0..sources.len()).map(|_| None).collect();

    let mut join_set = JoinSet::new();
    for (idx, source) in sources.iter().enumerate() {
        let limit = source.timeout();
        let source_name = names[idx].clone();
        let call = op(Arc::clone(source));
        join_set.spawn(async move {
            let result = match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout {
                    source_name,
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                }),
            };
            (idx, result)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, result)) => slots[idx] = Some(result),
            Err(e) => tracing::warn!("source task did not complete: {e}"),
        }
    }

    let entries = names
        .into_iter()
        .zip(slots)
        .map(|(source_name, slot)| {
            let result = slot.unwrap_or(Err(SourceError::Cancelled));
            match result {
                Ok(value) => SourceOutcome {
                    source_name,
                    value,
                    error: None,
                },
                Err(error) => {
                    tracing::warn!("{error}");
                    SourceOutcome {
                        source_name,
                        value: None,
                        error: Some(error),
                    }
                }
            }
        })
        .collect();

    FanoutOutcome { entries }
}
