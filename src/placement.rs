//! Data pool selection for new files.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::{ClusterSession, FsError, OpenFlags, Permissions};

/// The pool a new file goes to and the replication factor it will get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolChoice {
    /// Pool name.
    pub pool: String,
    /// Replication factor of the pool.
    pub replication: u32,
}

/// Pick the pool whose replication factor best matches `replication`.
///
/// Candidates are the pool backing the mount root plus `data_pools`. The
/// smallest factor at or above the request wins; when none is high enough the
/// largest factor wins. On equal factors later candidates replace earlier
/// ones, so configured pools override the default.
///
/// # Errors
///
/// - Any error resolving the default pool. Failures on configured pools are
///   logged and skipped.
pub fn select_data_pool<S>(
    session: &S,
    data_pools: &[String],
    replication: u32,
) -> Result<PoolChoice, FsError>
where
    S: ClusterSession + ?Sized,
{
    let default_pool = default_pool_name(session)?;
    let default_replication = session.pool_replication(&default_pool)?;

    let mut by_factor = BTreeMap::new();
    by_factor.insert(default_replication, default_pool);

    for pool in data_pools {
        match session.pool_replication(pool) {
            Ok(factor) => {
                by_factor.insert(factor, pool.clone());
            }
            Err(e) => warn!(pool = %pool, error = %e, "skipping data pool"),
        }
    }

    // The map always holds the default pool.
    let choice = select_from(&by_factor, replication).ok_or_else(|| FsError::PoolLookup {
        pool: String::new(),
        reason: "no candidate pools".into(),
    })?;

    if choice.replication != replication {
        info!(
            requested = replication,
            actual = choice.replication,
            pool = %choice.pool,
            "no pool with requested replication"
        );
    }
    debug!(pool = %choice.pool, replication = choice.replication, "selected data pool");
    Ok(choice)
}

/// Ceiling lookup in a factor → pool map, falling back to the largest factor.
pub fn select_from(by_factor: &BTreeMap<u32, String>, replication: u32) -> Option<PoolChoice> {
    by_factor
        .range(replication..)
        .next()
        .or_else(|| by_factor.last_key_value())
        .map(|(&factor, pool)| PoolChoice {
            pool: pool.clone(),
            replication: factor,
        })
}

fn default_pool_name<S>(session: &S) -> Result<String, FsError>
where
    S: ClusterSession + ?Sized,
{
    let handle = session.open(Path::new("/"), OpenFlags::READ, Permissions::default_dir())?;
    let pool = session.file_pool_name(handle);
    let closed = session.close(handle);
    let pool = pool?;
    closed?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries.iter().map(|&(f, p)| (f, p.to_string())).collect()
    }

    #[test]
    fn picks_smallest_factor_at_or_above() {
        let map = pools(&[(3, "p3"), (5, "p5"), (7, "p7")]);
        let choice = select_from(&map, 4).unwrap();
        assert_eq!(choice.pool, "p5");
        assert_eq!(choice.replication, 5);
    }

    #[test]
    fn exact_factor_wins() {
        let map = pools(&[(3, "p3"), (5, "p5"), (7, "p7")]);
        assert_eq!(select_from(&map, 3).unwrap().pool, "p3");
    }

    #[test]
    fn falls_back_to_largest() {
        let map = pools(&[(3, "p3"), (5, "p5"), (7, "p7")]);
        let choice = select_from(&map, 10).unwrap();
        assert_eq!(choice.pool, "p7");
        assert_eq!(choice.replication, 7);
    }

    #[test]
    fn low_request_gets_smallest() {
        let map = pools(&[(3, "p3"), (5, "p5")]);
        assert_eq!(select_from(&map, 1).unwrap().pool, "p3");
    }

    #[test]
    fn empty_map_selects_nothing() {
        assert!(select_from(&BTreeMap::new(), 3).is_none());
    }
}
