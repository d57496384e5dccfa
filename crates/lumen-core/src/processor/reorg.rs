//! Ancestor resolution after a detected chain reorganization.
//!
//! The arbiter cancels the epoch the moment a parent-hash mismatch shows
//! up; the chain runner then calls [`resolve_ancestor`] under the parent
//! (non-epoch) cancellation token so the search survives the epoch
//! teardown. The returned height becomes the chain's new cursor.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::processor::windows::WindowHashStore;
use crate::rpc::EthRpc;
use crate::utils::hex::format_hex_u64;

/// Searches backward through the stored window hashes for the highest
/// block that still matches the canonical chain.
///
/// Starting at the current cursor, the search walks down in `range_size`
/// steps for at most `window_cap` iterations. A candidate `a` is the
/// ancestor when the header at `a + 1` names the stored hash of `a` as its
/// parent. Window entries above the rewind point are dropped.
///
/// On lookup failure, cancellation, or an exhausted search, the hard
/// fallback `cursor - hard_fallback_blocks` (floored at 0) is returned
/// instead and the store is trimmed to match.
pub(crate) async fn resolve_ancestor(
    parent: &CancellationToken,
    rpc: &Arc<dyn EthRpc>,
    windows: &mut WindowHashStore,
    cursor: u64,
    range_size: u64,
    window_cap: u64,
    hard_fallback_blocks: u64,
) -> u64 {
    let fallback = cursor.saturating_sub(hard_fallback_blocks);
    let range_size = range_size.max(1);
    let mut candidate = cursor;

    for _ in 0..window_cap {
        if parent.is_cancelled() {
            windows.drop_after(fallback);
            return fallback;
        }

        let header = match rpc.block_by_number(&format_hex_u64(candidate + 1)).await {
            Ok(block) => block,
            Err(err) => {
                warn!(
                    block = candidate + 1,
                    error = %err,
                    fallback,
                    "header lookup failed during ancestor search, hard fallback"
                );
                windows.drop_after(fallback);
                return fallback;
            }
        };

        if let Some(stored) = windows.get(candidate) {
            if header.parent_hash == stored {
                info!(ancestor = candidate, "reorg ancestor found");
                windows.drop_after(candidate);
                return candidate;
            }
        }

        if candidate < range_size {
            candidate = 0;
            break;
        }
        candidate -= range_size;
    }

    warn!(
        cursor,
        fallback,
        last_candidate = candidate,
        "ancestor search exhausted, hard fallback"
    );
    windows.drop_after(fallback);
    fallback
}
