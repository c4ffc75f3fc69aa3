//! Percentile estimation and the per-combination measures shared by the analyzer and the filters.

use std::cmp::Ordering;

/// Linear-interpolation percentile over the sorted sample.
///
/// `rank = p / 100 * (n - 1)`; an integral rank returns that order statistic,
/// otherwise the two bracketing order statistics are interpolated. Empty samples
/// yield `0.0`. `p` is clamped to `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        return sorted[lower];
    }

    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// `floor(percentile(values, p))` for non-negative integer samples.
pub fn floor_percentile<T: Copy + Into<f64>>(values: &[T], p: f64) -> u32 {
    let sample: Vec<f64> = values.iter().map(|&v| v.into()).collect();
    percentile(&sample, p).floor() as u32
}

pub fn count_odd(numbers: &[u8]) -> usize {
    numbers.iter().filter(|&&n| n % 2 == 1).count()
}

pub fn count_multiples(numbers: &[u8], base: u8) -> usize {
    if base == 0 {
        return 0;
    }
    numbers.iter().filter(|&&n| n % base == 0).count()
}

pub fn sum(numbers: &[u8]) -> u32 {
    numbers.iter().map(|&n| n as u32).sum()
}

pub fn is_sum_in_range(numbers: &[u8], min: u32, max: u32) -> bool {
    let total = sum(numbers);
    total >= min && total <= max
}

/// Differences between neighbours of an ascending slice.
pub fn gaps(sorted: &[u8]) -> impl Iterator<Item = u8> + '_ {
    sorted.windows(2).map(|w| w[1].saturating_sub(w[0]))
}

pub fn max_gap_exceeds(sorted: &[u8], max_gap: u32) -> bool {
    gaps(sorted).any(|g| g as u32 > max_gap)
}

/// Length of the longest run of consecutive integers in an ascending slice.
pub fn max_consecutive_run(sorted: &[u8]) -> usize {
    if sorted.is_empty() {
        return 0;
    }

    let mut max_run = 1;
    let mut current = 1;
    for w in sorted.windows(2) {
        if w[1] == w[0].wrapping_add(1) {
            current += 1;
            max_run = max_run.max(current);
        } else {
            current = 1;
        }
    }
    max_run
}

/// Counts per bucket of `width` consecutive values starting at `min`
/// (with `min = 1, max = 50, width = 10`: 1-10, 11-20, ..., 41-50).
/// Numbers outside `[min, max]` are ignored.
pub fn cluster_counts(numbers: &[u8], min: u8, max: u8, width: u8) -> Vec<usize> {
    if width == 0 || max < min {
        return Vec::new();
    }
    let span = (max - min) as usize + 1;
    let width = width as usize;
    let mut counts = vec![0usize; span.div_ceil(width)];
    for &n in numbers {
        if n < min || n > max {
            continue;
        }
        counts[(n - min) as usize / width] += 1;
    }
    counts
}
