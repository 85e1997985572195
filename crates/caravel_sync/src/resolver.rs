//! Collection resolution.
//!
//! Maps the filters a client requests onto the collections actually
//! present in the store's scope. Runs once, before the session is built;
//! never re-evaluated while a session runs.

use crate::config::PartitionFilter;
use crate::error::{SyncError, SyncResult};

/// Sentinel collection name selecting every collection in the scope.
pub const EVERYTHING: &str = "_default";

/// Resolves requested filters against the collections present in the store.
///
/// An empty request, or one naming the [`EVERYTHING`] sentinel, selects all
/// available collections unfiltered. Otherwise the result is exactly the
/// requested filters, and naming a collection that does not exist is a
/// configuration error, not a silent skip.
pub fn resolve_collections(
    requested: &[PartitionFilter],
    available: &[String],
) -> SyncResult<Vec<PartitionFilter>> {
    let select_everything =
        requested.is_empty() || requested.iter().any(|f| f.collection == EVERYTHING);

    if select_everything {
        return Ok(available
            .iter()
            .map(PartitionFilter::replicate_all)
            .collect());
    }

    let mut resolved: Vec<PartitionFilter> = Vec::with_capacity(requested.len());
    for filter in requested {
        if !available.iter().any(|name| *name == filter.collection) {
            return Err(SyncError::CollectionNotFound {
                name: filter.collection.clone(),
            });
        }
        if resolved.iter().any(|f| f.collection == filter.collection) {
            tracing::debug!(collection = %filter.collection, "duplicate filter ignored");
            continue;
        }
        resolved.push(filter.clone());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> Vec<String> {
        vec!["inventory".into(), "returns".into(), "shipments".into()]
    }

    #[test]
    fn empty_request_selects_everything() {
        let resolved = resolve_collections(&[], &available()).unwrap();
        let names: Vec<_> = resolved.iter().map(|f| f.collection.as_str()).collect();
        assert_eq!(names, ["inventory", "returns", "shipments"]);
        assert!(resolved.iter().all(PartitionFilter::is_unfiltered));
    }

    #[test]
    fn sentinel_selects_everything() {
        let requested = vec![PartitionFilter::replicate_all(EVERYTHING)];
        let resolved = resolve_collections(&requested, &available()).unwrap();
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn named_collections_keep_their_filters() {
        let requested = vec![
            PartitionFilter::replicate_all("inventory").with_channels(["store0001"]),
            PartitionFilter::replicate_all("returns"),
        ];
        let resolved = resolve_collections(&requested, &available()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].channels, vec!["store0001".to_string()]);
    }

    #[test]
    fn missing_collection_is_an_error() {
        let requested = vec![
            PartitionFilter::replicate_all("inventory"),
            PartitionFilter::replicate_all("zebra"),
        ];
        let err = resolve_collections(&requested, &available()).unwrap_err();
        match err {
            SyncError::CollectionNotFound { name } => assert_eq!(name, "zebra"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_requests_collapse() {
        let requested = vec![
            PartitionFilter::replicate_all("inventory").with_channels(["blue"]),
            PartitionFilter::replicate_all("inventory"),
        ];
        let resolved = resolve_collections(&requested, &available()).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].channels, vec!["blue".to_string()]);
    }
}
