// ============================================================
// Layer 7 — Retrieval Accuracy@k
// ============================================================
// Given two aligned embedding matrices A and B (row i of A is
// the translation of row i of B), count how often B[i] is among
// the k nearest neighbours of A[i] by cosine distance.
//
// Steps:
//   1. Mean-centre A and B, each with its own column means.
//   2. Normalise rows, so cosine similarity is a dot product.
//   3. For every query row i, compute 1 - cos(A[i], B[j]) for
//      all j and find the rank of the true candidate i.
//   4. Row i matches when that rank is below k.
//
// Ranking and ties:
//   Candidates are ordered by ascending distance, and equal
//   distances by ascending candidate index, which is what a
//   stable sort over 0..n produces. With that order fixed, the
//   rank of candidate i is simply
//       #{ j : d_j < d_i }  +  #{ j < i : d_j == d_i }
//   so no per-row sort is needed and results are identical
//   across runs and platforms.
//
// Degenerate regime:
//   When n <= k every candidate list contains every index, so
//   accuracy is 1.0 whatever the embeddings look like. The score
//   is still returned but flagged `degenerate` and logged; it
//   carries no information about the encoder.
//
// Zero vectors:
//   A row equal to its matrix mean centres to zero and has no
//   direction. Two zero rows are at distance 0 from each other;
//   a zero row and a non-zero row are at distance 1 (cosine 0).
//   A zero query therefore still retrieves a zero target first.
//
// Non-finite values:
//   NaN compares false both ways, which would rank every true
//   candidate first. Inputs holding NaN or infinity are rejected.

use serde::{Deserialize, Serialize};

use crate::domain::embedding::EmbeddingMatrix;
use crate::domain::error::EvalError;
use crate::scoring::alignment::LinearAlignment;
use crate::scoring::dense::DenseMatrix;

/// Neighbourhood size of the headline metric.
pub const DEFAULT_TOP_K: usize = 100;

/// Outcome of one scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    /// Fraction of query rows whose true match is in their top-k.
    pub accuracy:   f64,
    /// Rows that were scored (after any alignment split).
    pub queries:    usize,
    pub matches:    usize,
    pub top_k:      usize,
    /// True when `queries <= top_k`, where accuracy is always 1.0.
    pub degenerate: bool,
    /// Rows spent fitting the linear alignment, if enabled.
    pub align_rows: Option<usize>,
}

/// Accuracy@100 of `a` against `b` with the default scorer.
pub fn compute_accuracy(a: &EmbeddingMatrix, b: &EmbeddingMatrix) -> Result<f64, EvalError> {
    Ok(RetrievalScorer::default().score(a, b)?.accuracy)
}

#[derive(Debug, Clone)]
pub struct RetrievalScorer {
    top_k:      usize,
    align_rows: Option<usize>,
}

impl Default for RetrievalScorer {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K, align_rows: None }
    }
}

impl RetrievalScorer {
    pub fn new(top_k: usize) -> Result<Self, EvalError> {
        if top_k == 0 {
            return Err(EvalError::InvalidTopK);
        }
        Ok(Self { top_k, align_rows: None })
    }

    /// Spend the first `rows` aligned pairs fitting a linear map from A to B.
    pub fn with_alignment(mut self, rows: usize) -> Self {
        self.align_rows = Some(rows);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Fail early if `rows` aligned pairs cannot be scored with this setup.
    pub fn check_rows(&self, rows: usize) -> Result<(), EvalError> {
        match self.align_rows {
            Some(fit) if fit == 0 || fit >= rows => {
                Err(EvalError::InvalidAlignmentRows { requested: fit, rows })
            }
            _ => Ok(()),
        }
    }

    pub fn score(&self, a: &EmbeddingMatrix, b: &EmbeddingMatrix) -> Result<AccuracyReport, EvalError> {
        if a.rows() != b.rows() {
            return Err(EvalError::RowMismatch { left: a.rows(), right: b.rows() });
        }
        if a.dim() != b.dim() {
            return Err(EvalError::DimMismatch { expected: a.dim(), actual: b.dim() });
        }
        if a.is_empty() {
            return Err(EvalError::Empty);
        }
        ensure_finite(a, "query")?;
        ensure_finite(b, "target")?;
        self.check_rows(a.rows())?;

        let queries = DenseMatrix::from_embeddings(a).mean_centered();
        let targets = DenseMatrix::from_embeddings(b).mean_centered();

        let (queries, targets) = match self.align_rows {
            None => (queries, targets),
            Some(fit) => {
                let n = queries.rows();
                let map = LinearAlignment::fit(
                    &queries.slice_rows(0, fit),
                    &targets.slice_rows(0, fit),
                )?;
                (map.apply(&queries.slice_rows(fit, n)), targets.slice_rows(fit, n))
            }
        };

        let n = queries.rows();
        let degenerate = n <= self.top_k;
        if degenerate {
            tracing::warn!(
                "Only {} query rows for top-{}: every row matches trivially, accuracy is 1.0",
                n, self.top_k
            );
        }

        let matches = match_flags(&queries, &targets, self.top_k)
            .into_iter()
            .filter(|&m| m)
            .count();
        let accuracy = matches as f64 / n as f64;

        tracing::debug!("accuracy@{} = {}/{} = {:.6}", self.top_k, matches, n, accuracy);

        Ok(AccuracyReport {
            accuracy,
            queries: n,
            matches,
            top_k: self.top_k,
            degenerate,
            align_rows: self.align_rows,
        })
    }
}

/// Per-query flags: is the true candidate within the query's top-k?
///
/// Inputs must already be centred (or aligned); rows are normalised here.
pub(crate) fn match_flags(queries: &DenseMatrix, targets: &DenseMatrix, k: usize) -> Vec<bool> {
    let queries = queries.clone().row_normalized();
    let targets = targets.clone().row_normalized();
    let n = targets.rows();
    let mut distances = vec![0.0_f64; n];

    (0..queries.rows())
        .map(|i| {
            let q = queries.row(i);
            for (j, d) in distances.iter_mut().enumerate() {
                *d = cosine_distance_unit(q, targets.row(j));
            }
            rank_of(&distances, i) < k
        })
        .collect()
}

fn ensure_finite(m: &EmbeddingMatrix, side: &'static str) -> Result<(), EvalError> {
    match m.iter_rows().position(|r| r.iter().any(|x| !x.is_finite())) {
        Some(row) => Err(EvalError::NonFinite { side, row }),
        None      => Ok(()),
    }
}

/// `1 - a·b` for unit (or zero) vectors.
fn cosine_distance_unit(a: &[f64], b: &[f64]) -> f64 {
    let is_zero = |v: &[f64]| v.iter().all(|&x| x == 0.0);
    match (is_zero(a), is_zero(b)) {
        (true, true)  => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => 1.0 - a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>(),
    }
}

/// Position of candidate `target` when candidates are sorted by
/// (distance, index) ascending.
fn rank_of(distances: &[f64], target: usize) -> usize {
    let dt = distances[target];
    distances
        .iter()
        .enumerate()
        .filter(|&(j, &d)| d < dt || (d == dt && j < target))
        .count()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn random_matrix(rng: &mut StdRng, n: usize, d: usize) -> EmbeddingMatrix {
        let rows = (0..n)
            .map(|_| (0..d).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
            .collect();
        EmbeddingMatrix::from_rows(rows).unwrap()
    }

    fn unit_rows(m: &EmbeddingMatrix) -> EmbeddingMatrix {
        let rows = m
            .iter_rows()
            .map(|r| {
                let norm = r.iter().map(|x| x * x).sum::<f32>().sqrt();
                r.iter().map(|x| x / norm).collect()
            })
            .collect();
        EmbeddingMatrix::from_rows(rows).unwrap()
    }

    /// Values on a 1/64 grid so adding a small offset is exact in f32.
    fn grid_matrix(rng: &mut StdRng, n: usize, d: usize) -> EmbeddingMatrix {
        let rows = (0..n)
            .map(|_| (0..d).map(|_| rng.gen_range(-64i32..=64) as f32 / 64.0).collect())
            .collect();
        EmbeddingMatrix::from_rows(rows).unwrap()
    }

    fn add_offset(m: &EmbeddingMatrix, offset: &[f32]) -> EmbeddingMatrix {
        let rows = m
            .iter_rows()
            .map(|r| r.iter().zip(offset).map(|(x, o)| x + o).collect())
            .collect();
        EmbeddingMatrix::from_rows(rows).unwrap()
    }

    fn permute_rows(m: &EmbeddingMatrix, perm: &[usize]) -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows(perm.iter().map(|&p| m.row(p).to_vec()).collect()).unwrap()
    }

    /// Rotate 0..n by a random non-zero shift: a permutation with no fixed points.
    fn derangement(rng: &mut StdRng, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let mut perm = vec![0; n];
        for i in 0..n {
            perm[order[i]] = order[(i + 1) % n];
        }
        perm
    }

    #[test]
    fn test_matrix_against_itself_is_perfect() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in [1, 2, 50, 150, 300] {
            let a = random_matrix(&mut rng, n, 16);
            assert_eq!(compute_accuracy(&a, &a).unwrap(), 1.0, "n = {n}");
        }
    }

    #[test]
    fn test_unit_vectors_self_retrieval() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = unit_rows(&random_matrix(&mut rng, 150, 16));
        let report = RetrievalScorer::default().score(&a, &a).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.queries, 150);
        assert!(!report.degenerate);
    }

    #[test]
    fn test_small_corpus_is_degenerate() {
        let mut rng = StdRng::seed_from_u64(3);
        for n in [1, 17, 100] {
            let a = random_matrix(&mut rng, n, 8);
            let b = random_matrix(&mut rng, n, 8);
            let report = RetrievalScorer::default().score(&a, &b).unwrap();
            assert_eq!(report.accuracy, 1.0);
            assert!(report.degenerate);
        }
    }

    #[test]
    fn test_constant_offset_invariance() {
        let mut rng = StdRng::seed_from_u64(21);
        let a = grid_matrix(&mut rng, 240, 12);
        // B is a noisy copy of A, so the score lands strictly between 0 and 1
        let noise = grid_matrix(&mut rng, 240, 12);
        let b = EmbeddingMatrix::from_rows(
            a.iter_rows()
                .zip(noise.iter_rows())
                .map(|(x, e)| x.iter().zip(e).map(|(x, e)| x + 2.0 * e).collect())
                .collect(),
        ).unwrap();

        let scorer = RetrievalScorer::new(10).unwrap();
        let base = scorer.score(&a, &b).unwrap().accuracy;
        assert!(base > 0.0 && base < 1.0, "base accuracy {base}");

        let offset: Vec<f32> = (0..12).map(|i| (i as f32 - 6.0) * 0.25).collect();
        let shifted_a = add_offset(&a, &offset);
        let shifted_b = add_offset(&b, &offset);
        assert_eq!(scorer.score(&shifted_a, &b).unwrap().accuracy, base);
        assert_eq!(scorer.score(&a, &shifted_b).unwrap().accuracy, base);
    }

    #[test]
    fn test_derangement_never_ranks_first() {
        let mut rng = StdRng::seed_from_u64(5);
        let a = random_matrix(&mut rng, 150, 16);
        let perm = derangement(&mut rng, 150);
        assert!(perm.iter().enumerate().all(|(i, &p)| i != p));
        let b = permute_rows(&a, &perm);

        // Each A[i]'s nearest B row is its own copy at a different index
        let at_1 = RetrievalScorer::new(1).unwrap().score(&a, &b).unwrap();
        assert_eq!(at_1.accuracy, 0.0);

        // With k = 100 of 150 candidates a random index often still lands
        // inside the window, but never for every row
        let at_100 = compute_accuracy(&a, &b).unwrap();
        assert!(at_100 < 1.0);
    }

    #[test]
    fn test_ties_break_by_candidate_index() {
        let mut rng = StdRng::seed_from_u64(9);
        let a = random_matrix(&mut rng, 150, 4);
        // Identical rows centre to zero, so every distance is exactly 1.0
        let b = EmbeddingMatrix::from_rows(vec![vec![0.5, -1.0, 2.0, 0.0]; 150]).unwrap();
        let accuracy = compute_accuracy(&a, &b).unwrap();
        // Row i wins the tie-break iff i is among the first 100 indices
        assert!((accuracy - 100.0 / 150.0).abs() < 1e-12);
    }

    #[test]
    fn test_centred_zero_row_still_finds_itself() {
        let mut rng = StdRng::seed_from_u64(23);
        let d = 6;
        let mut rows: Vec<Vec<f32>> = Vec::new();
        // ±v pairs; distinct first coordinates keep every row distinct
        for i in 0..73 {
            let mut v: Vec<f32> = (0..d).map(|_| rng.gen_range(-8i32..=8) as f32).collect();
            v[0] = (i + 1) as f32;
            rows.push(v.iter().map(|x| -x).collect());
            rows.push(v);
        }
        // a, b, -(a + b): sums to zero like the pairs
        let a: Vec<f32> = (0..d).map(|c| 100.0 + c as f32).collect();
        let b: Vec<f32> = (0..d).map(|c| 200.0 - 3.0 * c as f32).collect();
        let c: Vec<f32> = a.iter().zip(&b).map(|(x, y)| -(x + y)).collect();
        rows.extend([a, b, c]);
        // Column means are exactly zero, so this row stays zero after centring
        rows.push(vec![0.0; d]);
        assert_eq!(rows.len(), 150);

        let m = EmbeddingMatrix::from_rows(rows).unwrap();
        let report = RetrievalScorer::default().score(&m, &m).unwrap();
        assert!(!report.degenerate);
        assert_eq!(report.matches, 150);
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn test_zero_vector_distances() {
        assert_eq!(cosine_distance_unit(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_distance_unit(&[0.0, 0.0], &[0.6, 0.8]), 1.0);
        assert_eq!(cosine_distance_unit(&[1.0, 0.0], &[0.0, 0.0]), 1.0);
        assert!((cosine_distance_unit(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_embeddings_rejected() {
        let mut rng = StdRng::seed_from_u64(29);
        let nan = EmbeddingMatrix::from_rows(vec![vec![f32::NAN; 4]; 150]).unwrap();
        let b   = random_matrix(&mut rng, 150, 4);
        assert_eq!(
            compute_accuracy(&nan, &b),
            Err(EvalError::NonFinite { side: "query", row: 0 })
        );

        let mut rows: Vec<Vec<f32>> = b.iter_rows().map(|r| r.to_vec()).collect();
        rows[3][1] = f32::INFINITY;
        let inf = EmbeddingMatrix::from_rows(rows).unwrap();
        assert_eq!(
            compute_accuracy(&b, &inf),
            Err(EvalError::NonFinite { side: "target", row: 3 })
        );
    }

    #[test]
    fn test_rank_counting_matches_stable_sort() {
        let mut rng = StdRng::seed_from_u64(13);
        // Coarse grid so exact distance ties actually occur
        let rows: Vec<Vec<f32>> = (0..40)
            .map(|_| (0..3).map(|_| rng.gen_range(-2i32..=2) as f32).collect())
            .collect();
        let a = DenseMatrix::from_embeddings(&EmbeddingMatrix::from_rows(rows.clone()).unwrap()).mean_centered();
        let mut shuffled = rows;
        shuffled.shuffle(&mut rng);
        let b = DenseMatrix::from_embeddings(&EmbeddingMatrix::from_rows(shuffled).unwrap()).mean_centered();

        let k = 5;
        let fast = match_flags(&a, &b, k);

        let an = a.clone().row_normalized();
        let bn = b.clone().row_normalized();
        for i in 0..an.rows() {
            let dists: Vec<f64> = (0..bn.rows())
                .map(|j| cosine_distance_unit(an.row(i), bn.row(j)))
                .collect();
            let mut order: Vec<usize> = (0..dists.len()).collect();
            order.sort_by(|&x, &y| dists[x].partial_cmp(&dists[y]).unwrap());
            assert_eq!(fast[i], order[..k].contains(&i), "row {i}");
        }
    }

    #[test]
    fn test_shape_errors() {
        let a = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0]; 3]).unwrap();
        let short = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0]; 2]).unwrap();
        let wide = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0, 3.0]; 3]).unwrap();
        assert_eq!(
            compute_accuracy(&a, &short),
            Err(EvalError::RowMismatch { left: 3, right: 2 })
        );
        assert_eq!(
            compute_accuracy(&a, &wide),
            Err(EvalError::DimMismatch { expected: 2, actual: 3 })
        );
        let empty = EmbeddingMatrix::empty(2);
        assert_eq!(compute_accuracy(&empty, &empty), Err(EvalError::Empty));
        assert_eq!(RetrievalScorer::new(0).unwrap_err(), EvalError::InvalidTopK);
    }

    #[test]
    fn test_alignment_recovers_linear_map() {
        let mut rng = StdRng::seed_from_u64(17);
        let d = 8;
        let a = random_matrix(&mut rng, 300, d);
        let map: Vec<Vec<f32>> = (0..d)
            .map(|_| (0..d).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
            .collect();
        let b = EmbeddingMatrix::from_rows(
            a.iter_rows()
                .map(|r| {
                    (0..d)
                        .map(|c| (0..d).map(|i| r[i] * map[i][c]).sum::<f32>() + 0.5)
                        .collect()
                })
                .collect(),
        ).unwrap();

        let report = RetrievalScorer::new(1).unwrap()
            .with_alignment(100)
            .score(&a, &b)
            .unwrap();
        assert_eq!(report.queries, 200);
        assert_eq!(report.align_rows, Some(100));
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn test_alignment_rows_must_leave_queries() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = random_matrix(&mut rng, 10, 4);
        for rows in [0, 10, 11] {
            let err = RetrievalScorer::default().with_alignment(rows).score(&a, &a).unwrap_err();
            assert_eq!(err, EvalError::InvalidAlignmentRows { requested: rows, rows: 10 });
        }
        let scorer = RetrievalScorer::default().with_alignment(4);
        assert!(scorer.check_rows(5).is_ok());
        assert!(scorer.check_rows(4).is_err());
        assert!(RetrievalScorer::default().check_rows(1).is_ok());
    }
}
