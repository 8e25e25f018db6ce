//! Drops a stack of three boxes onto static ground and runs until they sleep.

use glam::{Mat3, Quat, Vec3};
use tracing::info;

use rein_physics::collider::{Collider, ConvexShape, Shape};
use rein_physics::dynamics::BodyProperties;
use rein_physics::{World, WorldConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut world = World::new(WorldConfig::default());

    let ground = world.add_body(BodyProperties::kinematic(), Vec3::ZERO, Quat::IDENTITY)?;
    world.attach_collider(
        ground,
        Collider::new(Shape::Convex(ConvexShape::BoundingBox {
            half_extents: Vec3::new(50.0, 0.05, 50.0),
        })),
    )?;

    let mut boxes = Vec::new();
    for i in 0..3 {
        let mut props = BodyProperties::dynamic(1.0, Mat3::IDENTITY)?;
        props.restitution = 0.0;
        let position = Vec3::new(0.0, 0.5 + i as f32, 0.0);
        let body = world.add_body(props, position, Quat::IDENTITY)?;
        world.attach_collider(body, Collider::new(Shape::Convex(ConvexShape::BoundingBox { half_extents: Vec3::splat(0.5) })))?;
        boxes.push(body);
    }

    let dt = 1.0 / 60.0;
    for frame in 0..(5 * 60) {
        world.step(dt)?;
        if frame % 60 == 0 {
            let positions: Vec<Vec3> = boxes.iter().map(|&b| world.body(b).unwrap().position).collect();
            info!(frame, ?positions, "stack state");
        }
    }

    let asleep = boxes.iter().all(|&b| world.body(b).unwrap().flags.sleeping);
    info!(asleep, "final state");
    Ok(())
}
