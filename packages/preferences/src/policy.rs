// ABOUTME: Failure-disposition policy for backend errors
// ABOUTME: One table fixing the fail-soft-on-cache, fail-hard-on-store asymmetry

/// Backend operation from the manager's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    CacheRead,
    CacheWrite,
    CacheDelete,
    StoreRead,
    StoreWrite,
    StoreDelete,
}

/// What the manager does with a failed backend operation. Absence sentinels
/// are normalized before this table applies: a cache miss falls through to
/// the store, a store miss on read becomes the definition default, a store
/// miss on delete is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Surface the error to the caller.
    Propagate,
    /// Log the error and serve the definition default.
    DefaultAndLog,
    /// Log the error and report success.
    SwallowAndLog,
}

/// The store is authoritative and the cache is an accelerator: store
/// failures always propagate, a broken cache never blocks a read, and a
/// cache update never fails an operation that already settled durably.
pub fn disposition(op: BackendOp) -> Disposition {
    match op {
        BackendOp::CacheRead => Disposition::DefaultAndLog,
        BackendOp::CacheWrite | BackendOp::CacheDelete => Disposition::SwallowAndLog,
        BackendOp::StoreRead | BackendOp::StoreWrite | BackendOp::StoreDelete => {
            Disposition::Propagate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_reads_degrade_to_default() {
        assert_eq!(disposition(BackendOp::CacheRead), Disposition::DefaultAndLog);
    }

    #[test]
    fn test_cache_mutations_are_swallowed() {
        assert_eq!(
            disposition(BackendOp::CacheWrite),
            Disposition::SwallowAndLog
        );
        assert_eq!(
            disposition(BackendOp::CacheDelete),
            Disposition::SwallowAndLog
        );
    }

    #[test]
    fn test_store_failures_always_propagate() {
        assert_eq!(disposition(BackendOp::StoreRead), Disposition::Propagate);
        assert_eq!(disposition(BackendOp::StoreWrite), Disposition::Propagate);
        assert_eq!(disposition(BackendOp::StoreDelete), Disposition::Propagate);
    }
}
