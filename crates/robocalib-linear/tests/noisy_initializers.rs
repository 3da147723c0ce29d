use nalgebra::{Translation3, UnitQuaternion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use robocalib_core::{
    pose_from_rvec_tvec, rotation_angle_between, synthetic::planar, BrownConrady5,
    CalibrationSample, CalibrationTarget, CameraIntrinsics, DetectedCorners, HandEyeMode,
    ImageSize, Iso3, PinholeParams, Pt2, Real, Vec3,
};
use robocalib_linear::{
    estimate_hand_eye, estimate_intrinsics_from_homographies, solve_pnp_linear,
    view_homographies, HandEyeLinearOptions, ZhangOptions,
};

fn camera() -> CameraIntrinsics {
    CameraIntrinsics::new(
        PinholeParams {
            fx: 900.0,
            fy: 900.0,
            cx: 640.0,
            cy: 360.0,
        },
        BrownConrady5::default(),
        ImageSize::new(1280, 720),
    )
}

fn jitter(views: Vec<DetectedCorners>, target: &CalibrationTarget, rng: &mut StdRng, px: Real) -> Vec<DetectedCorners> {
    views
        .into_iter()
        .map(|v| {
            let pts: Vec<Pt2> = v
                .points()
                .iter()
                .map(|p| Pt2::new(p.x + rng.random_range(-px..px), p.y + rng.random_range(-px..px)))
                .collect();
            DetectedCorners::found(v.image_index(), pts, target).unwrap()
        })
        .collect()
}

#[test]
fn zhang_and_pnp_tolerate_subpixel_noise() {
    let mut rng = StdRng::seed_from_u64(17);
    let target = CalibrationTarget::standard_9x6();
    let poses = planar::tilted_board_poses(&target, 10, 800.0);
    let views = planar::project_views(&camera(), &target, &poses);
    assert!(views.iter().all(|v| v.success()));
    let views = jitter(views, &target, &mut rng, 0.3);

    let hs = view_homographies(&target, &views).unwrap();
    let k = estimate_intrinsics_from_homographies(&hs, ImageSize::new(1280, 720), &ZhangOptions::default())
        .unwrap();
    assert!((k.fx - 900.0).abs() / 900.0 < 0.03, "fx {}", k.fx);
    assert!((k.fy - 900.0).abs() / 900.0 < 0.03, "fy {}", k.fy);

    let object = target.object_points();
    for (view, gt) in views.iter().zip(&poses) {
        let est = solve_pnp_linear(&object, view.points(), &camera()).unwrap();
        assert!(rotation_angle_between(&est, gt) < 0.01);
        assert!((est.translation.vector - gt.translation.vector).norm() < 10.0);
    }
}

#[test]
fn tsai_lenz_with_random_robot_poses() {
    let mut rng = StdRng::seed_from_u64(4);
    let x_gt = pose_from_rvec_tvec(&Vec3::new(0.1, -0.3, 0.2), &Vec3::new(30.0, 10.0, 80.0));
    let base_from_target = Iso3::translation(700.0, 0.0, 0.0);

    let samples: Vec<CalibrationSample> = (0..10)
        .map(|_| {
            let g = Iso3::from_parts(
                Translation3::new(
                    rng.random_range(300.0..600.0),
                    rng.random_range(-200.0..200.0),
                    rng.random_range(200.0..500.0),
                ),
                UnitQuaternion::from_euler_angles(
                    rng.random_range(-0.6..0.6),
                    rng.random_range(-0.6..0.6),
                    rng.random_range(-1.0..1.0),
                ),
            );
            let c = x_gt.inverse() * g.inverse() * base_from_target;
            CalibrationSample::new(c, g)
        })
        .collect();

    let (x, _) = estimate_hand_eye(&samples, HandEyeMode::EyeInHand, &HandEyeLinearOptions::default())
        .unwrap();
    assert!(rotation_angle_between(&x, &x_gt) < 1e-8);
    assert!((x.translation.vector - x_gt.translation.vector).norm() < 1e-5);
}
