//! Fetch planning: partitioning `(cursor, target]` into fixed-size block
//! ranges and streaming them to the fetcher pool.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// An inclusive block range fetched as a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockRange {
    pub from: u64,
    pub to: u64,
}

/// Iterator over the ranges covering `(cursor, target]` in `range_size`
/// steps. Ranges never overlap; the final range is clipped to `target`.
pub(crate) fn plan_ranges(
    cursor: u64,
    target: u64,
    range_size: u64,
) -> impl Iterator<Item = BlockRange> {
    let range_size = range_size.max(1);
    let mut from = cursor.saturating_add(1);
    let mut done = from > target;

    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let to = from.saturating_add(range_size - 1).min(target);
        let range = BlockRange { from, to };
        // A range ending at u64::MAX is necessarily the last one.
        match to.checked_add(1) {
            Some(next) => {
                from = next;
                done = from > target;
            }
            None => done = true,
        }
        Some(range)
    })
}

/// Streams planned ranges into `jobs_tx`, stopping on epoch cancellation
/// or when the pool stops listening. The channel closes when this task
/// returns.
pub(crate) async fn run_planner(
    epoch: CancellationToken,
    jobs_tx: mpsc::Sender<BlockRange>,
    cursor: u64,
    target: u64,
    range_size: u64,
) {
    for range in plan_ranges(cursor, target, range_size) {
        tokio::select! {
            () = epoch.cancelled() => return,
            sent = jobs_tx.send(range) => {
                if sent.is_err() {
                    return;
                }
                trace!(from = range.from, to = range.to, "planned fetch range");
            }
        }
    }
}
