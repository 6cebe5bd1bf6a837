//! Pose report binary - bends a demo joint chain and logs its geometry.
//!
//! Usage: cargo run --bin pose_report -- [OPTIONS]
//!
//! Options:
//!   --joints <N>      Number of joints in the chain (default: 5)
//!   --length <M>      Bone length in meters (default: 0.5)
//!   --bend <DEG>      Bend applied at every non-root joint, about Z (default: 20)
//!   --turn <DEG>      Root rotation about the up axis (default: 0)
//!   --order <ORDER>   Euler order for the bend/turn channels (default: "zyx")
//!   --config <PATH>   Pose config JSON (up/forward axes, epsilon, bone radius)

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use posekit::animation::{Pose, SkeletonBuilder};
use posekit::core::logging;
use posekit::math::{AngleUnit, EulerOrder};
use posekit::{PoseConfig, Result};

fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let joints = parse_usize_arg(args, "--joints").unwrap_or(5).max(1);
    let length = parse_f32_arg(args, "--length").unwrap_or(0.5);
    let bend = parse_f32_arg(args, "--bend").unwrap_or(20.0);
    let turn = parse_f32_arg(args, "--turn").unwrap_or(0.0);
    let order: EulerOrder = parse_str_arg(args, "--order")
        .unwrap_or_else(|| "zyx".to_string())
        .parse()?;

    let config = match parse_str_arg(args, "--config") {
        Some(path) => PoseConfig::load_sync(&PathBuf::from(path))?,
        None => PoseConfig::default(),
    };
    let up = config.up.normalize();

    let mut builder = SkeletonBuilder::new()
        .config(config.clone())
        .add_root("joint_0", Mat4::IDENTITY);
    for i in 1..joints {
        builder = builder.add_joint_at(&format!("joint_{i}"), &format!("joint_{}", i - 1), up * length);
    }
    let skeleton = Arc::new(builder.build()?);

    // channels follow the Euler order: angle i is about order axis i
    let channel = |axis: Vec3, degrees: f32| -> Vec3 {
        let mut angles = Vec3::ZERO;
        for (i, a) in order.axes().iter().enumerate() {
            if a.unit() == axis {
                angles[i] = degrees;
                break;
            }
        }
        angles
    };

    let mut angles = vec![channel(Vec3::Z, bend); joints];
    angles[0] = channel(Vec3::Y, turn);

    let pose = Pose::from_euler(skeleton.clone(), &angles, order, AngleUnit::Degrees, Vec3::ZERO)?;

    log::info!(
        "Chain of {} joints, bone length {}, bend {} deg, turn {} deg (order {})",
        joints, length, bend, turn, order
    );

    for (i, p) in pose.global_positions()?.iter().enumerate() {
        log::info!("  joint {:>2}: ({:>8.4}, {:>8.4}, {:>8.4})", i, p.x, p.y, p.z);
    }

    for segment in pose.bone_segments()? {
        let dir = segment.direction();
        log::info!(
            "  bone {:>2} -> {:>2}: length {:.4}, mid ({:.4}, {:.4}, {:.4}), dir ({:.3}, {:.3}, {:.3})",
            segment.parent, segment.joint, segment.length,
            segment.position.x, segment.position.y, segment.position.z,
            dir.x, dir.y, dir.z,
        );
    }

    let bounds = pose.bounds()?.inflated(config.bone_radius);
    log::info!(
        "Bounds: min ({:.4}, {:.4}, {:.4}) max ({:.4}, {:.4}, {:.4})",
        bounds.min.x, bounds.min.y, bounds.min.z,
        bounds.max.x, bounds.max.y, bounds.max.z,
    );

    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
