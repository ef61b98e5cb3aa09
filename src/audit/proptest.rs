//! Property-based tests for the audit log.
//!
//! - predicate confidence never decreases on rediscovery
//! - usage count equals the number of discoveries
//! - validation records per bundle equal the number recorded
