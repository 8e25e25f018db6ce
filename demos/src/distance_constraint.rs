//! Two spheres joined by a distance constraint; one is pushed and the pair
//! oscillates while holding separation.

use glam::{Mat3, Quat, Vec3};
use tracing::info;

use rein_physics::collider::{Collider, ConvexShape, Shape};
use rein_physics::dynamics::constraint::DistanceConstraint;
use rein_physics::dynamics::BodyProperties;
use rein_physics::{World, WorldConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut world = World::new(WorldConfig::default());

    let props = BodyProperties::dynamic(1.0, Mat3::IDENTITY)?;
    let a = world.add_body(props, Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY)?;
    let b = world.add_body(props, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY)?;
    for handle in [a, b] {
        world.attach_collider(handle, Collider::new(Shape::Convex(ConvexShape::Sphere { radius: 0.3 })))?;
    }

    world.add_constraint(Box::new(DistanceConstraint::new(a, b, Vec3::ZERO, Vec3::ZERO, 2.0)));
    world
        .body_mut(a)
        .expect("body a was just inserted")
        .apply_impulse_at_point(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));

    let dt = 1.0 / 60.0;
    for frame in 0..(2 * 60) {
        world.step(dt)?;
        if frame % 15 == 0 {
            let separation = (world.body(b).unwrap().position - world.body(a).unwrap().position).length();
            info!(frame, separation, "distance constraint state");
        }
    }

    Ok(())
}
