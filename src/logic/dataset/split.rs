//! Stratified train/test split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use ndarray::{Array2, Axis};

use crate::error::ClassifierError;

/// Default held-out fraction
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Default seed for the split and every classifier
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub y_train: Vec<usize>,
    pub x_test: Array2<f64>,
    pub y_test: Vec<usize>,
}

/// Split rows so that every class keeps its share in both halves.
///
/// `y` holds encoded class ordinals in `0..n_classes`.
pub fn stratified_split(
    x: &Array2<f64>,
    y: &[usize],
    n_classes: usize,
    test_size: f64,
    seed: u64,
) -> Result<Split, ClassifierError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ClassifierError::Training(format!("test size must be in (0, 1), got {}", test_size)));
    }
    if x.nrows() != y.len() {
        return Err(ClassifierError::Training(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }

    let n = y.len();
    let n_test = (n as f64 * test_size).ceil() as usize;

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &label) in y.iter().enumerate() {
        by_class
            .get_mut(label)
            .ok_or_else(|| ClassifierError::Training(format!("label ordinal {} out of range", label)))?
            .push(i);
    }

    let allocation = allocate_test_counts(&by_class, n_test, n);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut train_idx = Vec::with_capacity(n - n_test);
    let mut test_idx = Vec::with_capacity(n_test);

    for (class, indices) in by_class.iter_mut().enumerate() {
        let k = allocation[class];
        if k == 0 || k >= indices.len() {
            return Err(ClassifierError::Training(format!(
                "class {} has {} samples; cannot hold out {} of them",
                class,
                indices.len(),
                k
            )));
        }
        indices.shuffle(&mut rng);
        test_idx.extend_from_slice(&indices[..k]);
        train_idx.extend_from_slice(&indices[k..]);
    }

    train_idx.sort_unstable();
    test_idx.sort_unstable();

    Ok(Split {
        x_train: x.select(Axis(0), &train_idx),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        x_test: x.select(Axis(0), &test_idx),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

/// Proportional allocation: floors first, remainder to the largest fractional parts
fn allocate_test_counts(by_class: &[Vec<usize>], n_test: usize, n: usize) -> Vec<usize> {
    let exact: Vec<f64> = by_class
        .iter()
        .map(|c| c.len() as f64 * n_test as f64 / n as f64)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut order: Vec<usize> = (0..by_class.len()).collect();
    // Stable sort keeps class order among equal remainders
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });

    let mut remaining = n_test.saturating_sub(counts.iter().sum());
    for class in order {
        if remaining == 0 {
            break;
        }
        counts[class] += 1;
        remaining -= 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy(n_f: usize, n_m: usize) -> (Array2<f64>, Vec<usize>) {
        let n = n_f + n_m;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);
        let y = (0..n).map(|i| if i < n_f { 0 } else { 1 }).collect();
        (x, y)
    }

    #[test]
    fn test_split_sizes_and_stratification() {
        let (x, y) = toy(60, 40);
        let split = stratified_split(&x, &y, 2, 0.2, 42).unwrap();

        assert_eq!(split.x_test.nrows(), 20);
        assert_eq!(split.x_train.nrows(), 80);
        assert_eq!(split.y_test.iter().filter(|&&l| l == 0).count(), 12);
        assert_eq!(split.y_test.iter().filter(|&&l| l == 1).count(), 8);
    }

    #[test]
    fn test_split_is_reproducible() {
        let (x, y) = toy(33, 21);
        let a = stratified_split(&x, &y, 2, 0.2, 7).unwrap();
        let b = stratified_split(&x, &y, 2, 0.2, 7).unwrap();
        assert_eq!(a.x_test, b.x_test);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn test_rows_stay_aligned_with_labels() {
        let (x, y) = toy(10, 10);
        let split = stratified_split(&x, &y, 2, 0.3, 1).unwrap();
        for (row, &label) in split.x_train.rows().into_iter().zip(&split.y_train) {
            let original = (row[0] / 2.0) as usize;
            assert_eq!(y[original], label);
        }
    }

    #[test]
    fn test_tiny_class_is_rejected() {
        let (x, y) = toy(10, 1);
        assert!(stratified_split(&x, &y, 2, 0.2, 42).is_err());
    }
}
