//! Sim3 alignment from 3D point correspondences: Horn's method with RANSAC.
//!
//! Reference: B.K.P. Horn, "Closed-form solution of absolute orientation
//! using unit quaternions".

use nalgebra::{Matrix3, Vector3};
use rand::prelude::*;

use crate::geometry::Sim3;

/// Configuration for the Sim3 RANSAC solver.
#[derive(Debug, Clone)]
pub struct AlignConfig {
    /// Maximum number of RANSAC iterations.
    pub max_iterations: usize,
    /// Inlier threshold in meters (point-to-point error).
    pub inlier_threshold: f64,
    /// Minimum number of inliers required.
    pub min_inliers: usize,
    /// Fix scale to 1.0 (rigid alignment).
    pub fix_scale: bool,
    /// Probability of finding a good model.
    pub probability: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            inlier_threshold: 0.075,
            min_inliers: 10,
            fix_scale: false,
            probability: 0.99,
        }
    }
}

/// Result of a successful alignment.
#[derive(Debug, Clone)]
pub struct AlignResult {
    /// Transform such that target ≈ transform * source.
    pub transform: Sim3,
    /// Indices of inlier correspondences.
    pub inliers: Vec<usize>,
    /// Mean squared error over the inliers.
    pub mse: f64,
}

/// Estimate the Sim3 mapping `source` points onto `target` points.
///
/// `None` if too few correspondences survive RANSAC.
pub fn align_sim3_ransac(
    source: &[Vector3<f64>],
    target: &[Vector3<f64>],
    config: &AlignConfig,
) -> Option<AlignResult> {
    let n = source.len();
    if n < 3 || n != target.len() || n < config.min_inliers {
        return None;
    }

    let mut rng = rand::thread_rng();
    let mut best: Option<AlignResult> = None;
    let mut best_inliers = 0;
    let mut max_iter = config.max_iterations;

    let mut iteration = 0;
    while iteration < max_iter {
        let indices = sample_three_indices(&mut rng, n);
        let sample_src: Vec<_> = indices.iter().map(|&i| source[i]).collect();
        let sample_tgt: Vec<_> = indices.iter().map(|&i| target[i]).collect();

        iteration += 1;
        let Some(transform) = solve_horn(&sample_src, &sample_tgt, config.fix_scale) else {
            continue;
        };

        let (inliers, mse) = find_inliers(source, target, &transform, config.inlier_threshold);
        if inliers.len() > best_inliers {
            best_inliers = inliers.len();
            best = Some(AlignResult {
                transform,
                inliers,
                mse,
            });

            // Adaptive cutoff from the current inlier ratio.
            if best_inliers >= config.min_inliers {
                let ratio = best_inliers as f64 / n as f64;
                let needed = adaptive_iterations(ratio, config.probability, 3);
                max_iter = max_iter.min(iteration.saturating_add(needed));
            }
        }
    }

    // Refine on all inliers.
    if let Some(ref mut result) = best {
        if result.inliers.len() >= config.min_inliers {
            let src: Vec<_> = result.inliers.iter().map(|&i| source[i]).collect();
            let tgt: Vec<_> = result.inliers.iter().map(|&i| target[i]).collect();
            if let Some(refined) = solve_horn(&src, &tgt, config.fix_scale) {
                let (inliers, mse) =
                    find_inliers(source, target, &refined, config.inlier_threshold);
                if inliers.len() >= result.inliers.len() {
                    result.transform = refined;
                    result.inliers = inliers;
                    result.mse = mse;
                }
            }
        }
    }

    best.filter(|r| r.inliers.len() >= config.min_inliers)
}

/// Closed-form Sim3 from point correspondences (Horn's method).
///
/// Centroids, scale from centered norms, rotation via SVD of the
/// cross-covariance, translation last.
fn solve_horn(source: &[Vector3<f64>], target: &[Vector3<f64>], fix_scale: bool) -> Option<Sim3> {
    let n = source.len();
    if n < 3 {
        return None;
    }

    let centroid_src = centroid(source);
    let centroid_tgt = centroid(target);
    let centered_src: Vec<_> = source.iter().map(|p| p - centroid_src).collect();
    let centered_tgt: Vec<_> = target.iter().map(|p| p - centroid_tgt).collect();

    let scale = if fix_scale {
        1.0
    } else {
        let sum_src: f64 = centered_src.iter().map(|p| p.norm_squared()).sum();
        let sum_tgt: f64 = centered_tgt.iter().map(|p| p.norm_squared()).sum();
        if sum_src < 1e-10 {
            return None;
        }
        (sum_tgt / sum_src).sqrt()
    };

    let mut h = Matrix3::zeros();
    for i in 0..n {
        h += centered_src[i] * centered_tgt[i].transpose();
    }
    let svd = h.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut rotation_mat = v_t.transpose() * u.transpose();

    // Reflection case: flip the last column of V.
    if rotation_mat.determinant() < 0.0 {
        let mut v = v_t.transpose();
        for i in 0..3 {
            v[(i, 2)] = -v[(i, 2)];
        }
        rotation_mat = v * u.transpose();
    }

    let translation = centroid_tgt - scale * (rotation_mat * centroid_src);
    Some(Sim3::from_rts(rotation_mat, translation, scale))
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    if points.is_empty() {
        return Vector3::zeros();
    }
    points.iter().sum::<Vector3<f64>>() / points.len() as f64
}

fn find_inliers(
    source: &[Vector3<f64>],
    target: &[Vector3<f64>],
    transform: &Sim3,
    threshold: f64,
) -> (Vec<usize>, f64) {
    let threshold_sq = threshold * threshold;
    let mut inliers = Vec::new();
    let mut sum_sq = 0.0;
    for (i, (src, tgt)) in source.iter().zip(target.iter()).enumerate() {
        let err_sq = (transform.transform_point(src) - tgt).norm_squared();
        if err_sq < threshold_sq {
            inliers.push(i);
            sum_sq += err_sq;
        }
    }
    let mse = if inliers.is_empty() {
        f64::INFINITY
    } else {
        sum_sq / inliers.len() as f64
    };
    (inliers, mse)
}

fn sample_three_indices(rng: &mut impl Rng, n: usize) -> [usize; 3] {
    let mut indices = [0usize; 3];
    indices[0] = rng.gen_range(0..n);
    loop {
        indices[1] = rng.gen_range(0..n);
        if indices[1] != indices[0] {
            break;
        }
    }
    loop {
        indices[2] = rng.gen_range(0..n);
        if indices[2] != indices[0] && indices[2] != indices[1] {
            break;
        }
    }
    indices
}

/// k = log(1 - p) / log(1 - w^n) for inlier ratio w and sample size n.
fn adaptive_iterations(inlier_ratio: f64, probability: f64, sample_size: usize) -> usize {
    if inlier_ratio <= 0.0 {
        return usize::MAX;
    }
    if inlier_ratio >= 1.0 {
        return 1;
    }
    let w_n = inlier_ratio.powi(sample_size as i32);
    let log_denom = (1.0 - w_n).ln();
    if log_denom.abs() < 1e-10 {
        return 1;
    }
    let k = (1.0 - probability).ln() / log_denom;
    (k.ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_3;

    fn known_transform() -> Sim3 {
        Sim3 {
            rotation: UnitQuaternion::from_euler_angles(0.1, FRAC_PI_3, -0.4),
            translation: Vector3::new(2.0, -1.0, 0.7),
            scale: 1.5,
        }
    }

    fn cloud() -> Vec<Vector3<f64>> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        (0..40)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(1.0..10.0),
                )
            })
            .collect()
    }

    #[test]
    fn recovers_known_sim3() {
        let truth = known_transform();
        let source = cloud();
        let target: Vec<_> = source.iter().map(|p| truth.transform_point(p)).collect();

        let result = align_sim3_ransac(&source, &target, &AlignConfig::default()).unwrap();
        assert_eq!(result.inliers.len(), source.len());
        assert!((result.transform.scale - truth.scale).abs() < 1e-6);
        assert!((result.transform.translation - truth.translation).norm() < 1e-6);
    }

    #[test]
    fn tolerates_outliers() {
        let truth = known_transform();
        let source = cloud();
        let mut target: Vec<_> = source.iter().map(|p| truth.transform_point(p)).collect();
        // corrupt a quarter of the correspondences
        for tgt in target.iter_mut().take(10) {
            *tgt += Vector3::new(30.0, -20.0, 10.0);
        }

        let result = align_sim3_ransac(&source, &target, &AlignConfig::default()).unwrap();
        assert!(result.inliers.len() >= 30);
        assert!((result.transform.translation - truth.translation).norm() < 1e-4);
    }

    #[test]
    fn rejects_insufficient_correspondences() {
        let source = vec![Vector3::zeros(); 2];
        let target = vec![Vector3::zeros(); 2];
        assert!(align_sim3_ransac(&source, &target, &AlignConfig::default()).is_none());
    }

    #[test]
    fn adaptive_iteration_schedule() {
        assert_eq!(adaptive_iterations(1.0, 0.99, 3), 1);
        assert!(adaptive_iterations(0.5, 0.99, 3) < 50);
        assert_eq!(adaptive_iterations(0.0, 0.99, 3), usize::MAX);
    }

    #[test]
    fn clean_data_stops_well_before_the_iteration_budget() {
        let truth = known_transform();
        let source = cloud();
        let target: Vec<_> = source.iter().map(|p| truth.transform_point(p)).collect();

        // An all-inlier consensus cuts the budget to the next iteration; an
        // absurdly large budget finishes instantly only if the cutoff works.
        let config = AlignConfig {
            max_iterations: 50_000_000,
            ..AlignConfig::default()
        };
        let result = align_sim3_ransac(&source, &target, &config).unwrap();
        assert_eq!(result.inliers.len(), source.len());
    }
}
