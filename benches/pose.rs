use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, black_box};
use glam::{Mat3, Mat4, Quat, Vec3};

use posekit::animation::{Motion, Pose, Skeleton, SkeletonBuilder};
use posekit::math::rotation;

fn create_chain(joints: usize) -> Arc<Skeleton> {
    let mut builder = SkeletonBuilder::new().add_root("joint_0", Mat4::IDENTITY);
    for i in 1..joints {
        builder = builder.add_joint_at(&format!("joint_{i}"), &format!("joint_{}", i - 1), Vec3::Y * 0.1);
    }
    Arc::new(builder.build().expect("valid chain"))
}

fn create_pose(skeleton: &Arc<Skeleton>, phase: f32) -> Pose {
    let rotations = (0..skeleton.joint_count())
        .map(|i| Quat::from_rotation_z((i as f32 * 0.1 + phase).sin() * 0.3))
        .collect();
    Pose::new(skeleton.clone(), rotations, Vec3::ZERO).expect("valid pose")
}

fn bench_global_transforms_64(c: &mut Criterion) {
    let skeleton = create_chain(64);
    let pose = create_pose(&skeleton, 0.0);

    c.bench_function("global_transforms_64", |b| {
        b.iter(|| black_box(&pose).global_transforms())
    });
}

fn bench_bone_segments_64(c: &mut Criterion) {
    let skeleton = create_chain(64);
    let pose = create_pose(&skeleton, 0.0);

    c.bench_function("bone_segments_64", |b| {
        b.iter(|| black_box(&pose).bone_segments())
    });
}

fn bench_motion_parallel(c: &mut Criterion) {
    let skeleton = create_chain(64);
    let mut motion = Motion::new("bench", skeleton.clone(), 60.0).expect("valid frame rate");
    for frame in 0..600 {
        motion
            .push_pose(create_pose(&skeleton, frame as f32 / 60.0))
            .expect("same skeleton");
    }

    c.bench_function("motion_global_transforms_par_600", |b| {
        b.iter(|| black_box(&motion).global_transforms_par())
    });
}

fn bench_rotation_round_trip(c: &mut Criterion) {
    let m = Mat3::from_axis_angle(Vec3::new(1.0, 2.0, 3.0).normalize(), 1.3);

    c.bench_function("mat3_quat_sixd_round_trip", |b| {
        b.iter(|| {
            let q = rotation::mat3_to_quat(black_box(m));
            let sixd = rotation::quat_to_sixd(q, 1e-8);
            sixd.and_then(|s| rotation::sixd_to_mat3(s, 1e-8))
        })
    });
}

criterion_group!(
    benches,
    bench_global_transforms_64,
    bench_bone_segments_64,
    bench_motion_parallel,
    bench_rotation_round_trip,
);
criterion_main!(benches);
