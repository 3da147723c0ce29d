//! Hand-eye calibration (`AX = XB`) with Tsai–Lenz.
//!
//! Rotation is solved first from the quaternion form of `R_A R_X = R_X R_B`
//! stacked over all motion pairs; translation follows from
//! `(R_A − I) t_X = R_X t_B − t_A` in least squares.
//!
//! Before solving, the rotation axes of the kept motions must span at least
//! two directions. The spread is measured on the axes themselves through the
//! two leading eigenvalues of `Σ θᵢ² aᵢ aᵢᵀ`, so pose noise on a single-axis
//! motion set cannot pass for real diversity.

use log::debug;
use nalgebra::{DMatrix, DVector, Matrix4, Quaternion, Rotation3, Translation3, UnitQuaternion};
use robocalib_core::{
    project_to_so3, singular_value_ratio, CalibError, CalibResult, CalibrationSample,
    HandEyeMode, Iso3, Mat3, PairingStrategy, Real, Vec3,
};

use crate::math::null_vector;

/// Relative motion of the robot chain (`A`) and of the camera chain (`B`)
/// between two samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPair {
    pub rot_a: Mat3,
    pub rot_b: Mat3,
    pub tra_a: Vec3,
    pub tra_b: Vec3,
}

impl MotionPair {
    /// Rotation magnitudes of `A` and `B` (radians).
    pub fn angles(&self) -> (Real, Real) {
        (rotation_angle(&self.rot_a), rotation_angle(&self.rot_b))
    }
}

/// Settings for the closed-form hand-eye estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandEyeLinearOptions {
    pub pairing: PairingStrategy,
    /// Pairs whose robot or camera rotation is smaller than this are skipped.
    pub min_rotation_deg: Real,
    /// Reject the motion set when `σ3 / σ1` of the rotation system falls
    /// below this ratio.
    pub min_singular_ratio: Real,
    /// Smallest angle (degrees) the motion rotation axes must span.
    pub min_axis_spread_deg: Real,
}

impl Default for HandEyeLinearOptions {
    fn default() -> Self {
        Self {
            pairing: PairingStrategy::Consecutive,
            min_rotation_deg: 1.0,
            min_singular_ratio: 1e-3,
            min_axis_spread_deg: 2.0,
        }
    }
}

/// Minimum number of samples for a hand-eye solve.
pub const MIN_HAND_EYE_SAMPLES: usize = 3;

/// Relative motion between samples `i` and `j` for the given mounting.
///
/// Eye-in-hand: `A = G_i⁻¹ G_j`, `B = C_i C_j⁻¹`, `X = T_gripper_cam`.
/// Eye-to-hand: `A = G_i G_j⁻¹`, `B = C_i C_j⁻¹`, `X = T_base_cam`.
fn make_motion_pair(
    mode: HandEyeMode,
    a: &CalibrationSample,
    b: &CalibrationSample,
) -> CalibResult<MotionPair> {
    let motion_a = match mode {
        HandEyeMode::EyeInHand => a.robot_pose.inverse() * b.robot_pose,
        HandEyeMode::EyeToHand => a.robot_pose * b.robot_pose.inverse(),
    };
    let motion_b = a.camera_pose * b.camera_pose.inverse();

    let so3 = |m: &Iso3| {
        project_to_so3(m.rotation.to_rotation_matrix().matrix())
            .ok_or_else(|| CalibError::Numerical("svd failed during hand-eye estimation".into()))
    };
    Ok(MotionPair {
        rot_a: so3(&motion_a)?,
        rot_b: so3(&motion_b)?,
        tra_a: motion_a.translation.vector,
        tra_b: motion_b.translation.vector,
    })
}

/// Build motion pairs from samples according to `pairing`.
pub fn build_motion_pairs(
    samples: &[CalibrationSample],
    mode: HandEyeMode,
    pairing: PairingStrategy,
) -> CalibResult<Vec<MotionPair>> {
    let n = samples.len();
    let mut pairs = Vec::new();
    match pairing {
        PairingStrategy::Consecutive => {
            for w in samples.windows(2) {
                pairs.push(make_motion_pair(mode, &w[0], &w[1])?);
            }
        }
        PairingStrategy::AllPairs => {
            for i in 0..n.saturating_sub(1) {
                for j in (i + 1)..n {
                    pairs.push(make_motion_pair(mode, &samples[i], &samples[j])?);
                }
            }
        }
    }
    Ok(pairs)
}

fn quat_left(q: &UnitQuaternion<Real>) -> Matrix4<Real> {
    let w = q.w;
    let (x, y, z) = (q.i, q.j, q.k);
    Matrix4::new(w, -x, -y, -z, x, w, -z, y, y, z, w, -x, z, -y, x, w)
}

fn quat_right(q: &UnitQuaternion<Real>) -> Matrix4<Real> {
    let w = q.w;
    let (x, y, z) = (q.i, q.j, q.k);
    Matrix4::new(w, -x, -y, -z, x, w, z, -y, y, -z, w, x, z, y, -x, w)
}

/// Unit quaternion with non-negative scalar part.
fn canonical_quat(r: &Mat3) -> UnitQuaternion<Real> {
    let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*r));
    if q.w < 0.0 {
        UnitQuaternion::new_unchecked(-q.into_inner())
    } else {
        q
    }
}

fn rotation_angle(r: &Mat3) -> Real {
    ((r.trace() - 1.0) * 0.5).clamp(-1.0, 1.0).acos()
}

/// Second-largest over largest eigenvalue of `Σ θᵢ² aᵢ aᵢᵀ` for the rotation
/// axes `aᵢ` of the given rotations. Zero when every axis is parallel.
///
/// For two equally weighted axes `φ` apart this is `tan²(φ / 2)`.
pub fn axis_spread<'a>(rotations: impl IntoIterator<Item = &'a Mat3>) -> Real {
    let mut scatter = Mat3::zeros();
    for r in rotations {
        let v = canonical_quat(r).scaled_axis();
        scatter += v * v.transpose();
    }
    let mut eig = scatter.symmetric_eigenvalues();
    eig.as_mut_slice().sort_by(|a, b| b.total_cmp(a));
    if !(eig[0] > 0.0) {
        return 0.0;
    }
    (eig[1].max(0.0) / eig[0]).min(1.0)
}

/// Spread ratio that two equally weighted axes `deg` apart reach.
fn spread_threshold(deg: Real) -> Real {
    (0.5 * deg.to_radians()).tan().powi(2)
}

/// Fail with `DegenerateMotion` unless the robot and camera rotation axes
/// both span at least `min_spread_deg`.
pub fn check_axis_spread(pairs: &[MotionPair], min_spread_deg: Real) -> CalibResult<()> {
    let spread_a = axis_spread(pairs.iter().map(|p| &p.rot_a));
    let spread_b = axis_spread(pairs.iter().map(|p| &p.rot_b));
    let spread = spread_a.min(spread_b);
    let threshold = spread_threshold(min_spread_deg);
    debug!("hand-eye: axis spread A = {spread_a:.3e}, B = {spread_b:.3e}, threshold {threshold:.3e}");
    if !(spread >= threshold) {
        return Err(CalibError::DegenerateMotion(format!(
            "rotation axes of the motions span less than {min_spread_deg:.1} deg \
             (spread {spread:.2e} < {threshold:.2e}); rotate about at least two distinct axes"
        )));
    }
    Ok(())
}

/// Tsai–Lenz over a set of motion pairs.
#[derive(Debug, Clone, Copy)]
pub struct HandEyeInit;

impl HandEyeInit {
    /// Rotation `R_X` from `(L(q_A) − R(q_B)) q_X = 0`.
    pub fn rotation(pairs: &[MotionPair], min_singular_ratio: Real) -> CalibResult<Mat3> {
        let mut m = DMatrix::<Real>::zeros(4 * pairs.len(), 4);
        for (idx, p) in pairs.iter().enumerate() {
            let qa = canonical_quat(&p.rot_a);
            let qb = canonical_quat(&p.rot_b);
            m.view_mut((4 * idx, 0), (4, 4))
                .copy_from(&(quat_left(&qa) - quat_right(&qb)));
        }

        let (q, sv) = null_vector(&m)
            .ok_or_else(|| CalibError::Numerical("svd failed during hand-eye estimation".into()))?;
        let ratio = singular_value_ratio(&sv, 2);
        debug!("hand-eye: {} pairs, sigma3/sigma1 = {ratio:.3e}", pairs.len());
        if !(ratio >= min_singular_ratio) {
            return Err(CalibError::DegenerateMotion(format!(
                "rotation axes of the robot motions are (nearly) parallel \
                 (sigma3/sigma1 = {ratio:.2e}); rotate about at least two distinct axes"
            )));
        }

        let q = UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]));
        Ok(q.to_rotation_matrix().into_inner())
    }

    /// Translation `t_X` given `R_X`.
    pub fn translation(pairs: &[MotionPair], rot_x: &Mat3) -> CalibResult<Vec3> {
        let mut c = DMatrix::<Real>::zeros(3 * pairs.len(), 3);
        let mut w = DVector::<Real>::zeros(3 * pairs.len());
        for (idx, p) in pairs.iter().enumerate() {
            c.view_mut((3 * idx, 0), (3, 3))
                .copy_from(&(p.rot_a - Mat3::identity()));
            w.rows_mut(3 * idx, 3).copy_from(&(rot_x * p.tra_b - p.tra_a));
        }
        ridge_llsq(&c, &w, 1e-12)
    }

    /// Full closed-form `X` from motion pairs.
    pub fn tsai_lenz(pairs: &[MotionPair], min_singular_ratio: Real) -> CalibResult<Iso3> {
        let rot_x = Self::rotation(pairs, min_singular_ratio)?;
        let t_x = Self::translation(pairs, &rot_x)?;
        Ok(Iso3::from_parts(
            Translation3::from(t_x),
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot_x)),
        ))
    }
}

/// Closed-form hand-eye transform from paired samples.
///
/// Pairs with too little rotation are skipped; if none remain, or the
/// remaining rotation axes span less than `min_axis_spread_deg`, the motion
/// is reported as degenerate.
pub fn estimate_hand_eye(
    samples: &[CalibrationSample],
    mode: HandEyeMode,
    opts: &HandEyeLinearOptions,
) -> CalibResult<(Iso3, Vec<MotionPair>)> {
    if samples.len() < MIN_HAND_EYE_SAMPLES {
        return Err(CalibError::InsufficientSamples {
            needed: MIN_HAND_EYE_SAMPLES,
            got: samples.len(),
        });
    }
    let min_angle = opts.min_rotation_deg.to_radians();
    let pairs: Vec<MotionPair> = build_motion_pairs(samples, mode, opts.pairing)?
        .into_iter()
        .enumerate()
        .filter(|(idx, p)| {
            let (a, b) = p.angles();
            let keep = a.min(b) >= min_angle;
            if !keep {
                debug!("hand-eye: skipping pair {idx}, rotation {:.3} deg", a.min(b).to_degrees());
            }
            keep
        })
        .map(|(_, p)| p)
        .collect();
    if pairs.is_empty() {
        return Err(CalibError::DegenerateMotion(format!(
            "no robot motion rotates more than {:.1} deg",
            opts.min_rotation_deg
        )));
    }
    check_axis_spread(&pairs, opts.min_axis_spread_deg)?;
    let x = HandEyeInit::tsai_lenz(&pairs, opts.min_singular_ratio)?;
    Ok((x, pairs))
}

/// RMS translation and rotation (radians) residuals of `AX = XB`.
pub fn motion_residuals(pairs: &[MotionPair], x: &Iso3) -> (Real, Real) {
    if pairs.is_empty() {
        return (0.0, 0.0);
    }
    let r_x = *x.rotation.to_rotation_matrix().matrix();
    let t_x = x.translation.vector;
    let (mut sum_t, mut sum_r) = (0.0, 0.0);
    for p in pairs {
        let ax_t = p.rot_a * t_x + p.tra_a;
        let xb_t = r_x * p.tra_b + t_x;
        sum_t += (ax_t - xb_t).norm_squared();
        let diff = (p.rot_a * r_x).transpose() * (r_x * p.rot_b);
        sum_r += rotation_angle(&diff).powi(2);
    }
    let n = pairs.len() as Real;
    ((sum_t / n).sqrt(), (sum_r / n).sqrt())
}

/// Ridge-regularized least squares: `min ‖A x − b‖² + λ‖x‖²`.
fn ridge_llsq(a: &DMatrix<Real>, b: &DVector<Real>, lambda: Real) -> CalibResult<Vec3> {
    let m = a.nrows();
    let n = a.ncols();
    let mut a_aug = DMatrix::<Real>::zeros(m + n, n);
    a_aug.view_mut((0, 0), (m, n)).copy_from(a);
    let sqrt_lambda = lambda.sqrt();
    for i in 0..n {
        a_aug[(m + i, i)] = sqrt_lambda;
    }
    let mut b_aug = DVector::<Real>::zeros(m + n);
    b_aug.rows_mut(0, m).copy_from(b);

    let x = a_aug
        .svd(true, true)
        .solve(&b_aug, 1e-12)
        .map_err(|e| CalibError::Numerical(format!("hand-eye translation solve failed: {e}")))?;
    Ok(Vec3::new(x[0], x[1], x[2]))
}
