/// Postgres access for vocl-service
///
/// Plain functions over `&PgPool` (or any executor where a caller needs a
/// transaction) using runtime `query_as`, one module per table group.
pub mod audit_repo;
pub mod engagement_repo;
pub mod notification_repo;
pub mod post_repo;
pub mod profile_repo;
pub mod report_repo;
pub mod stats_repo;
pub mod tag_repo;

/// Keyset bounds for `(timestamp, id)` cursors. When a client sends only the
/// timestamp, the id side falls back to these so the comparison stays strict.
pub(crate) const NIL_UUID: &str = "'00000000-0000-0000-0000-000000000000'::uuid";
pub(crate) const MAX_UUID: &str = "'ffffffff-ffff-ffff-ffff-ffffffffffff'::uuid";
