//! Physics engine benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench
//! Filter:     cargo bench -- broadphase

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat3, Mat4, Quat, Vec3};
use slotmap::SlotMap;

use rein_physics::collider::{Collider, ConvexShape, Shape};
use rein_physics::dynamics::constraint::{Constraint, FrictionContactConstraint, NormalContactConstraint};
use rein_physics::dynamics::solver::{pgs_solve, ConstraintInput};
use rein_physics::dynamics::BodyProperties;
use rein_physics::handles::BodyHandle;
use rein_physics::narrowphase::convex_convex;
use rein_physics::{broadphase::Broadphase, RigidBody, World, WorldConfig};

// ---------------------------------------------------------------------------
// Broadphase
// ---------------------------------------------------------------------------

fn sphere_world(n: usize) -> SlotMap<rein_physics::ColliderHandle, Collider> {
    let mut colliders = SlotMap::with_key();
    let cols = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % cols) as f32 * 1.5;
        let z = (i / cols) as f32 * 1.5;
        let mut c = Collider::new(Shape::Convex(ConvexShape::Sphere { radius: 1.0 }));
        c.set_world_transform(Mat4::from_translation(Vec3::new(x, 0.0, z)));
        colliders.insert(c);
    }
    colliders
}

fn bench_broadphase(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadphase/uniform_spheres");
    for &n in &[100, 500, 1000, 2000] {
        let colliders = sphere_world(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            let mut bp = Broadphase::new();
            b.iter(|| bp.find_pairs(&colliders, |_| false));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Narrowphase
// ---------------------------------------------------------------------------

fn bench_narrowphase(c: &mut Criterion) {
    let cfg = WorldConfig::default();

    {
        let mut group = c.benchmark_group("narrowphase/sphere_sphere");
        let shape = ConvexShape::Sphere { radius: 1.0 };
        let xf_a = Mat4::IDENTITY;

        let xf_b_hit = Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0));
        group.bench_function("intersecting", |b| {
            b.iter(|| convex_convex(&shape, xf_a, &shape, xf_b_hit, &cfg));
        });

        let xf_b_miss = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        group.bench_function("separated", |b| {
            b.iter(|| convex_convex(&shape, xf_a, &shape, xf_b_miss, &cfg));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/box_box");
        let shape = ConvexShape::BoundingBox { half_extents: Vec3::splat(1.0) };
        let xf_a = Mat4::IDENTITY;

        let xf_b_hit = Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0));
        group.bench_function("intersecting", |b| {
            b.iter(|| convex_convex(&shape, xf_a, &shape, xf_b_hit, &cfg));
        });

        let xf_b_rot =
            Mat4::from_rotation_y(0.785) * Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0));
        group.bench_function("rotated", |b| {
            b.iter(|| convex_convex(&shape, xf_a, &shape, xf_b_rot, &cfg));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/batch");
        for &n in &[100, 500, 1000] {
            let shape = ConvexShape::Sphere { radius: 1.0 };
            let pairs: Vec<(Mat4, Mat4)> = (0..n)
                .map(|i| {
                    let x = i as f32 * 3.0;
                    (
                        Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
                        Mat4::from_translation(Vec3::new(x + 1.5, 0.0, 0.0)),
                    )
                })
                .collect();

            group.bench_with_input(BenchmarkId::from_parameter(n), &pairs, |b, pairs| {
                b.iter(|| {
                    for &(xf_a, xf_b) in pairs {
                        convex_convex(&shape, xf_a, &shape, xf_b, &cfg);
                    }
                });
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

fn stacked_bodies(n: usize) -> (SlotMap<BodyHandle, RigidBody>, Vec<BodyHandle>) {
    let mut bodies = SlotMap::with_key();
    let mut handles = Vec::with_capacity(n + 1);

    let ground = RigidBody::new(BodyProperties::kinematic(), Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY);
    handles.push(bodies.insert(ground));

    for i in 0..n {
        let props = BodyProperties::dynamic(1.0, Mat3::IDENTITY).unwrap();
        let body = RigidBody::new(props, Vec3::new(0.0, 0.5 + i as f32, 0.0), Quat::IDENTITY);
        handles.push(bodies.insert(body));
    }
    (bodies, handles)
}

fn contact_constraints(handles: &[BodyHandle]) -> Vec<Box<dyn Constraint>> {
    let mut constraints: Vec<Box<dyn Constraint>> = Vec::new();
    for pair in handles.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        constraints.push(Box::new(NormalContactConstraint {
            body_a: a,
            body_b: b,
            point_a: Vec3::ZERO,
            point_b: Vec3::ZERO,
            normal: Vec3::Y,
            penetration: 0.01,
            restitution: 0.0,
            warm_start: 0.0,
            baumgarte: 0.2,
            restitution_slop: 0.01,
            penetration_slop: 0.005,
        }));
        constraints.push(Box::new(FrictionContactConstraint {
            body_a: a,
            body_b: b,
            point_a: Vec3::ZERO,
            point_b: Vec3::ZERO,
            tangent: Vec3::X,
            friction_coefficient: 0.5,
            warm_start: 0.0,
        }));
    }
    constraints
}

fn bench_solver(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("solver/contact_count");
        for &n in &[10, 50, 100, 500] {
            let (bodies, handles) = stacked_bodies(n);
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter_batched(
                    || (bodies.clone(), contact_constraints(&handles)),
                    |(mut bodies, mut constraints)| {
                        let mut inputs: Vec<ConstraintInput> = constraints
                            .iter_mut()
                            .map(|c| ConstraintInput { constraint: c, coupled_normal: None })
                            .collect();
                        pgs_solve(&mut bodies, &mut inputs, 1.0 / 60.0, 8);
                    },
                    criterion::BatchSize::SmallInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("solver/iterations");
        let (bodies, handles) = stacked_bodies(100);
        for &iters in &[1, 4, 8, 16, 32] {
            group.bench_with_input(BenchmarkId::from_parameter(iters), &iters, |b, &iters| {
                b.iter_batched(
                    || (bodies.clone(), contact_constraints(&handles)),
                    |(mut bodies, mut constraints)| {
                        let mut inputs: Vec<ConstraintInput> = constraints
                            .iter_mut()
                            .map(|c| ConstraintInput { constraint: c, coupled_normal: None })
                            .collect();
                        pgs_solve(&mut bodies, &mut inputs, 1.0 / 60.0, iters);
                    },
                    criterion::BatchSize::SmallInput,
                );
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

fn scene(n: usize) -> World {
    let mut world = World::new(WorldConfig::default());
    let ground = world
        .add_body(BodyProperties::kinematic(), Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY)
        .unwrap();
    world
        .attach_collider(
            ground,
            Collider::new(Shape::Convex(ConvexShape::BoundingBox {
                half_extents: Vec3::new(100.0, 0.5, 100.0),
            })),
        )
        .unwrap();

    let cols = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % cols) as f32 * 2.0 - cols as f32;
        let z = (i / cols) as f32 * 2.0 - cols as f32;
        let y = 1.0 + (i % 5) as f32 * 1.5;
        let props = BodyProperties::dynamic(1.0, Mat3::IDENTITY).unwrap();
        let body = world.add_body(props, Vec3::new(x, y, z), Quat::IDENTITY).unwrap();
        let shape = if i % 2 == 0 {
            ConvexShape::Sphere { radius: 0.5 }
        } else {
            ConvexShape::BoundingBox { half_extents: Vec3::splat(0.4) }
        };
        world
            .attach_collider(body, Collider::new(Shape::Convex(shape)))
            .unwrap();
    }
    world
}

fn bench_pipeline(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("pipeline/step");
        group.sample_size(30);
        for &n in &[50, 100, 500, 1000] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || scene(n),
                    |mut world| {
                        world.step(1.0 / 60.0).unwrap();
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/sustained_10steps");
        group.sample_size(20);
        for &n in &[100, 500] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || scene(n),
                    |mut world| {
                        for _ in 0..10 {
                            world.step(1.0 / 60.0).unwrap();
                        }
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_broadphase, bench_narrowphase, bench_solver, bench_pipeline);
criterion_main!(benches);
