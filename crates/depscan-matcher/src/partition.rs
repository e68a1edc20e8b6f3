//! Static assignment of candidate files to workers

use std::ops::Range;

/// Split `0..file_count` into `workers` contiguous half-open ranges of
/// `ceil(file_count / workers)` indices each. Trailing ranges are empty when
/// there are fewer files than workers.
pub fn partitions(file_count: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return Vec::new();
    }
    let chunk = file_count.div_ceil(workers);
    (0..workers)
        .map(|i| {
            let start = (i * chunk).min(file_count);
            let end = ((i + 1) * chunk).min(file_count);
            start..end
        })
        .collect()
}
