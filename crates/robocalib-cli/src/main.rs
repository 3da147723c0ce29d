//! `robocalib` command-line tool.
//!
//! Every subcommand reads JSON/CSV/PNG inputs and prints a JSON document on
//! stdout, so stages can be chained through files:
//!
//! ```text
//! robocalib detect --target 9x6:25 img*.png > detections.json
//! robocalib intrinsics --detections detections.json > intrinsics.json
//! robocalib pose --detections detections.json --intrinsics intrinsics.json > poses.json
//! robocalib handeye --poses poses.json --chain arm.json --joints joints.csv --mode eye-in-hand
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use robocalib::core::{euler_xyz_deg, pose_from_matrix4, pose_to_matrix4, Matrix4Rows, Real};
use robocalib::kinematics::parse_joint_csv;
use robocalib::{
    calibrate_intrinsics_with, compute_pose, detect_files, solve_hand_eye_with, solve_pose_with,
    summarize, CalibrationConfig, CalibrationSample, CalibrationTarget, CameraIntrinsics,
    ChainDescriptor, DetectedCorners, DetectionSummary, HandEyeMode, ImageSize, IntrinsicsReport,
    KinematicChain,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Checkerboard detection, camera intrinsics and hand-eye calibration"
)]
struct Cli {
    /// Calibration settings (JSON). Missing fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detect checkerboard corners in PNG images.
    Detect(DetectArgs),
    /// Estimate camera intrinsics from a detection file.
    Intrinsics(IntrinsicsArgs),
    /// Board pose for every detected view.
    Pose(PoseArgs),
    /// Gripper poses for rows of joint values.
    Fk(FkArgs),
    /// Camera-to-robot transform from paired poses.
    Handeye(HandEyeArgs),
}

#[derive(Debug, Args)]
struct DetectArgs {
    /// Board geometry: `COLSxROWS:SQUARE_MM` (inner corners) or a preset
    /// (`standard-9x6`, `board-14x8`).
    #[arg(long, value_parser = parse_target, default_value = "standard-9x6")]
    target: CalibrationTarget,

    /// Images in capture order; the position is the image index.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct IntrinsicsArgs {
    /// Output of `detect`.
    #[arg(long)]
    detections: PathBuf,
}

#[derive(Debug, Args)]
struct PoseArgs {
    /// Output of `detect`.
    #[arg(long)]
    detections: PathBuf,

    /// Output of `intrinsics`, or a bare camera description.
    #[arg(long)]
    intrinsics: PathBuf,
}

#[derive(Debug, Args)]
struct FkArgs {
    /// Kinematic chain description (JSON).
    #[arg(long)]
    chain: PathBuf,

    /// Joint values: header row, then one row per robot stop.
    #[arg(long)]
    joints: PathBuf,
}

#[derive(Debug, Args)]
struct HandEyeArgs {
    #[arg(long, value_enum)]
    mode: ModeArg,

    /// Paired 4×4 camera and robot poses (JSON).
    #[arg(long, conflicts_with_all = ["poses", "chain", "joints"])]
    samples: Option<PathBuf>,

    /// Output of `pose`; paired with joint rows by image index.
    #[arg(long, requires_all = ["chain", "joints"])]
    poses: Option<PathBuf>,

    #[arg(long)]
    chain: Option<PathBuf>,

    #[arg(long)]
    joints: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    EyeInHand,
    EyeToHand,
}

impl From<ModeArg> for HandEyeMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::EyeInHand => HandEyeMode::EyeInHand,
            ModeArg::EyeToHand => HandEyeMode::EyeToHand,
        }
    }
}

/// Result of a detection pass, the input of `intrinsics` and `pose`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DetectionSet {
    target: CalibrationTarget,
    image_size: ImageSize,
    detections: Vec<DetectedCorners>,
    #[serde(default)]
    summary: Vec<DetectionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IntrinsicsInput {
    Report(IntrinsicsReport),
    Camera(CameraIntrinsics),
}

impl IntrinsicsInput {
    fn into_camera(self) -> CameraIntrinsics {
        match self {
            IntrinsicsInput::Report(r) => r.intrinsics,
            IntrinsicsInput::Camera(c) => c,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PoseRow {
    image_index: usize,
    /// `T_cam_board`, row-major.
    transformation_matrix: Matrix4Rows,
    rms_error: Real,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FkRow {
    row: usize,
    /// `T_base_tip`, row-major.
    transformation_matrix: Matrix4Rows,
    translation: [Real; 3],
    /// XYZ Euler angles in degrees.
    rotation_euler: [Real; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SampleRow {
    camera_pose: Matrix4Rows,
    robot_pose: Matrix4Rows,
}

fn parse_target(s: &str) -> Result<CalibrationTarget, String> {
    match s {
        "standard-9x6" => return Ok(CalibrationTarget::standard_9x6()),
        "board-14x8" => return Ok(CalibrationTarget::board_14x8()),
        _ => {}
    }
    let (dims, square) = s
        .split_once(':')
        .ok_or_else(|| format!("expected COLSxROWS:SQUARE_MM or a preset, got '{s}'"))?;
    let (cols, rows) = dims
        .split_once('x')
        .ok_or_else(|| format!("expected COLSxROWS, got '{dims}'"))?;
    let cols: usize = cols.trim().parse().map_err(|_| format!("bad column count '{cols}'"))?;
    let rows: usize = rows.trim().parse().map_err(|_| format!("bad row count '{rows}'"))?;
    let square: Real = square
        .trim()
        .parse()
        .map_err(|_| format!("bad square size '{square}'"))?;
    CalibrationTarget::new(cols, rows, square).map_err(|e| e.to_string())
}

fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<CalibrationConfig> {
    match path {
        Some(p) => load_json_file(p),
        None => Ok(CalibrationConfig::default()),
    }
}

fn load_chain(path: &Path) -> Result<KinematicChain> {
    let desc: ChainDescriptor = load_json_file(path)?;
    KinematicChain::from_descriptor(&desc)
        .with_context(|| format!("invalid chain in {}", path.display()))
}

fn load_joints(path: &Path) -> Result<Vec<Vec<Real>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_joint_csv(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn run_detect(args: &DetectArgs, cfg: &CalibrationConfig) -> Result<String> {
    let (width, height) = image::image_dimensions(&args.images[0])
        .with_context(|| format!("failed to open {}", args.images[0].display()))?;
    let detections = detect_files(&args.images, &args.target, &cfg.detector);
    for (path, det) in args.images.iter().zip(&detections) {
        if !det.success() {
            warn!("no board in {}", path.display());
        }
    }
    let set = DetectionSet {
        target: args.target,
        image_size: ImageSize::new(width, height),
        summary: summarize(&detections),
        detections,
    };
    to_json(&set)
}

fn run_intrinsics(args: &IntrinsicsArgs, cfg: &CalibrationConfig) -> Result<String> {
    let set: DetectionSet = load_json_file(&args.detections)?;
    let report = calibrate_intrinsics_with(
        &set.detections,
        &set.target,
        set.image_size,
        &cfg.intrinsics,
        &cfg.solver,
    )
    .context("intrinsics calibration failed")?;
    info!(
        "rms {:.4} px ({:?})",
        report.intrinsics.rms_reprojection_error(),
        report.intrinsics.quality()
    );
    to_json(&report)
}

fn run_pose(args: &PoseArgs, cfg: &CalibrationConfig) -> Result<String> {
    let set: DetectionSet = load_json_file(&args.detections)?;
    let camera = load_json_file::<IntrinsicsInput>(&args.intrinsics)?.into_camera();
    let mut rows = Vec::new();
    for det in set.detections.iter().filter(|d| d.success()) {
        let sol = solve_pose_with(det, &set.target, &camera, &cfg.pnp, &cfg.solver)
            .with_context(|| format!("pose of image {} failed", det.image_index()))?;
        rows.push(PoseRow {
            image_index: det.image_index(),
            transformation_matrix: pose_to_matrix4(&sol.pose),
            rms_error: sol.rms_error,
        });
    }
    ensure!(!rows.is_empty(), "no detected views in {}", args.detections.display());
    to_json(&rows)
}

fn run_fk(args: &FkArgs) -> Result<String> {
    let chain = load_chain(&args.chain)?;
    let joints = load_joints(&args.joints)?;
    let rows = joints
        .iter()
        .enumerate()
        .map(|(row, q)| {
            let pose = compute_pose(&chain, q).with_context(|| format!("joint row {row}"))?;
            Ok(FkRow {
                row,
                transformation_matrix: pose_to_matrix4(&pose),
                translation: pose.translation.vector.into(),
                rotation_euler: euler_xyz_deg(&pose),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    to_json(&rows)
}

fn collect_samples(args: &HandEyeArgs) -> Result<Vec<CalibrationSample>> {
    if let Some(path) = &args.samples {
        let rows: Vec<SampleRow> = load_json_file(path)?;
        return rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Ok(CalibrationSample::new(
                    pose_from_matrix4(&r.camera_pose).with_context(|| format!("sample {i} camera pose"))?,
                    pose_from_matrix4(&r.robot_pose).with_context(|| format!("sample {i} robot pose"))?,
                ))
            })
            .collect();
    }

    let (Some(poses), Some(chain), Some(joints)) = (&args.poses, &args.chain, &args.joints) else {
        bail!("pass either --samples or --poses with --chain and --joints");
    };
    let poses: Vec<PoseRow> = load_json_file(poses)?;
    let chain = load_chain(chain)?;
    let joints = load_joints(joints)?;
    poses
        .iter()
        .map(|p| {
            let q = joints.get(p.image_index).with_context(|| {
                format!("no joint row for image {} ({} rows)", p.image_index, joints.len())
            })?;
            let robot = compute_pose(&chain, q).with_context(|| format!("joint row {}", p.image_index))?;
            let camera = pose_from_matrix4(&p.transformation_matrix)
                .with_context(|| format!("pose of image {}", p.image_index))?;
            Ok(CalibrationSample::new(camera, robot))
        })
        .collect()
}

fn run_handeye(args: &HandEyeArgs, cfg: &CalibrationConfig) -> Result<String> {
    let samples = collect_samples(args)?;
    let result = solve_hand_eye_with(&samples, args.mode.into(), &cfg.hand_eye, &cfg.solver)
        .context("hand-eye calibration failed")?;
    to_json(&result.to_record())
}

fn run(cli: &Cli) -> Result<String> {
    let cfg = load_config(cli.config.as_deref())?;
    match &cli.command {
        Command::Detect(args) => run_detect(args, &cfg),
        Command::Intrinsics(args) => run_intrinsics(args, &cfg),
        Command::Pose(args) => run_pose(args, &cfg),
        Command::Fk(args) => run_fk(args),
        Command::Handeye(args) => run_handeye(args, &cfg),
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    println!("{}", run(&cli)?);
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
