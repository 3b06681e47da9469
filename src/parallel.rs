//! Parallel extract fan-out using Rayon.

use rayon::prelude::*;

use crate::error::Result;

/// Minimum number of extracts before fanning out across threads.
/// Below this threshold, dispatch overhead outweighs the per-extract work
/// done for a single entity.
pub const PARALLEL_THRESHOLD: usize = 8;

/// Apply `f` to every item, in parallel when there are enough items.
///
/// Each item is visited exactly once per call, so per-item side effects
/// (such as writes to one extract's sink) keep the caller's order across
/// calls. The first error aborts the fan-out.
pub fn try_for_each<T, F>(items: &mut [T], f: F) -> Result<()>
where
    T: Send,
    F: Fn(&mut T) -> Result<()> + Sync + Send,
{
    if items.len() >= PARALLEL_THRESHOLD {
        items.par_iter_mut().try_for_each(f)
    } else {
        items.iter_mut().try_for_each(f)
    }
}
