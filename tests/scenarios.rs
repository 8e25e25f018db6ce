//! End-to-end scenarios exercising the full step pipeline and the narrowphase
//! entry point directly, with literal expected values.

use glam::{Mat3, Mat4, Quat, Vec3};

use rein_physics::collider::{Collider, ConvexShape, Shape};
use rein_physics::dynamics::constraint::DistanceConstraint;
use rein_physics::dynamics::BodyProperties;
use rein_physics::narrowphase::{convex_convex, NarrowphaseResult};
use rein_physics::{World, WorldConfig};

fn add_box(world: &mut World, props: BodyProperties, position: Vec3, half_extents: Vec3) -> rein_physics::BodyHandle {
    let body = world.add_body(props, position, Quat::IDENTITY).unwrap();
    world
        .attach_collider(body, Collider::new(Shape::Convex(ConvexShape::BoundingBox { half_extents })))
        .unwrap();
    body
}

#[test]
fn free_fall() {
    let mut world = World::new(WorldConfig::default());
    let props = BodyProperties::dynamic(1.0, Mat3::IDENTITY).unwrap();
    let body = world.add_body(props, Vec3::new(0.0, 10.0, 0.0), Quat::IDENTITY).unwrap();

    let dt = 1.0 / 60.0;
    for _ in 0..60 {
        world.step(dt).unwrap();
    }

    let state = world.body(body).unwrap();
    assert!((state.position.y - 5.1).abs() < 0.05, "y = {}", state.position.y);
    assert!((state.linear_velocity.y + 9.8).abs() < 0.05, "vy = {}", state.linear_velocity.y);
}

#[test]
fn sphere_settles_on_plane() {
    let mut world = World::new(WorldConfig::default());

    let ground_props = BodyProperties::kinematic();
    let ground = world.add_body(ground_props, Vec3::ZERO, Quat::IDENTITY).unwrap();
    world
        .attach_collider(
            ground,
            Collider::new(Shape::Convex(ConvexShape::BoundingBox {
                half_extents: Vec3::new(50.0, 0.05, 50.0),
            })),
        )
        .unwrap();

    let mut sphere_props = BodyProperties::dynamic(1.0, Mat3::IDENTITY).unwrap();
    sphere_props.restitution = 0.0;
    let sphere = world.add_body(sphere_props, Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY).unwrap();
    world
        .attach_collider(sphere, Collider::new(Shape::Convex(ConvexShape::Sphere { radius: 1.0 })))
        .unwrap();

    let dt = 1.0 / 60.0;
    for _ in 0..(5 * 60) {
        world.step(dt).unwrap();
    }

    let state = world.body(sphere).unwrap();
    assert!((state.position.y - 1.0).abs() < 0.02, "y = {}", state.position.y);
    assert!(state.linear_velocity.length() < 0.05, "|v| = {}", state.linear_velocity.length());
}

#[test]
fn distance_constraint_holds_separation() {
    let mut world = World::new(WorldConfig::default());
    let props = BodyProperties::dynamic(1.0, Mat3::IDENTITY).unwrap();
    let a = world.add_body(props, Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY).unwrap();
    let b = world.add_body(props, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY).unwrap();

    world.add_constraint(Box::new(DistanceConstraint::new(a, b, Vec3::ZERO, Vec3::ZERO, 2.0)));
    world
        .body_mut(a)
        .unwrap()
        .apply_impulse_at_point(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));

    let dt = 1.0 / 60.0;
    for _ in 0..60 {
        world.step(dt).unwrap();
    }

    let separation = (world.body(b).unwrap().position - world.body(a).unwrap().position).length();
    assert!((separation - 2.0).abs() < 0.01, "separation = {separation}");
}

#[test]
fn gjk_reports_disjoint_boxes() {
    let cfg = WorldConfig::default();
    let shape = ConvexShape::BoundingBox { half_extents: Vec3::splat(0.5) };
    let xf_a = Mat4::from_translation(Vec3::ZERO);
    let xf_b = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0));

    match convex_convex(&shape, xf_a, &shape, xf_b, &cfg) {
        NarrowphaseResult::Separated { distance } => {
            assert!((distance - 2.0).abs() < 0.05, "distance = {distance}");
        }
        NarrowphaseResult::Overlapping(_) => panic!("expected disjoint boxes"),
    }
}

#[test]
fn epa_reports_penetration() {
    let cfg = WorldConfig::default();
    let shape = ConvexShape::BoundingBox { half_extents: Vec3::splat(0.5) };
    let xf_a = Mat4::from_translation(Vec3::ZERO);
    let xf_b = Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0));

    match convex_convex(&shape, xf_a, &shape, xf_b, &cfg) {
        NarrowphaseResult::Overlapping(epa) => {
            assert!((epa.normal.x.abs() - 1.0).abs() < 1e-3, "normal = {:?}", epa.normal);
            assert!((epa.penetration - 0.5).abs() < 1e-3, "penetration = {}", epa.penetration);
        }
        NarrowphaseResult::Separated { .. } => panic!("expected overlap"),
    }
}

#[test]
fn stack_of_three_boxes_settles_to_sleep() {
    let mut world = World::new(WorldConfig::default());

    let ground_props = BodyProperties::kinematic();
    add_box(&mut world, ground_props, Vec3::ZERO, Vec3::new(50.0, 0.05, 50.0));

    let mut handles = Vec::new();
    for i in 0..3 {
        let mut props = BodyProperties::dynamic(1.0, Mat3::IDENTITY).unwrap();
        props.restitution = 0.0;
        let position = Vec3::new(0.0, 0.5 + i as f32, 0.0);
        handles.push(add_box(&mut world, props, position, Vec3::splat(0.5)));
    }

    let dt = 1.0 / 60.0;
    for _ in 0..(3 * 60) {
        world.step(dt).unwrap();
    }

    let expected_y = [0.5, 1.5, 2.5];
    for (handle, &expected) in handles.iter().zip(&expected_y) {
        let body = world.body(*handle).unwrap();
        assert!(
            (body.position.y - expected).abs() < 0.01,
            "expected y near {expected}, got {}",
            body.position.y
        );
        assert!(body.flags.sleeping, "expected body to be asleep");
    }
}
