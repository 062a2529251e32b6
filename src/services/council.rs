//! Concurrent fan-out of one request to every council member.

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::domain::models::{Completion, Turn};
use crate::infrastructure::endpoints::Endpoint;

/// Query every endpoint concurrently.
///
/// Returns one [`Completion`] per endpoint, in input order. No
/// short-circuiting: a member that fails (network error, non-2xx, empty
/// content) resolves its own slot with an embedded error and never delays
/// the others. Zero endpoints returns an empty list immediately.
///
/// The caller owns the endpoints; this function never closes them.
pub async fn dispatch(
    endpoints: &[Arc<dyn Endpoint>],
    turns: &[Turn],
    system: &str,
) -> Vec<Completion> {
    if endpoints.is_empty() {
        return Vec::new();
    }

    debug!(members = endpoints.len(), "dispatching council query");
    join_all(
        endpoints
            .iter()
            .map(|endpoint| endpoint.complete(turns, system)),
    )
    .await
}

/// Close every endpoint's connection pool.
pub async fn close_all(endpoints: &[Arc<dyn Endpoint>]) {
    join_all(endpoints.iter().map(|endpoint| endpoint.close())).await;
}
