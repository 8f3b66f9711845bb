//! The beaker germs live in: a base and two side walls

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{PhysicsWorld, ShapeHandle};
use crate::config::GameConfig;

/// Beaker dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beaker {
    /// Centre of the base
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub wall_width: f32,
}

impl Beaker {
    pub fn from_config(config: &GameConfig) -> Self {
        let (w, h) = (config.screen_width, config.screen_height);
        Self {
            x: w * config.beaker.centre_x,
            y: h * config.beaker.base_y,
            width: w * config.beaker.width,
            height: h * config.beaker.height,
            wall_width: h * config.beaker.wall,
        }
    }

    /// Top of the walls
    pub fn rim(&self) -> f32 {
        self.y + self.height
    }

    /// Inner horizontal extent (between the walls)
    pub fn inner_span(&self) -> (f32, f32) {
        let half = self.width / 2.0 - self.wall_width;
        (self.x - half, self.x + half)
    }

    /// Add the beaker to the world as static boxes: base, left wall, right wall
    pub fn build<W: PhysicsWorld>(&self, world: &mut W) -> Vec<ShapeHandle> {
        let wall_offset = (self.width - self.wall_width) / 2.0;
        let wall_height = self.height - self.wall_width;
        let parts = [
            (Vec2::new(self.x, self.y), self.width, self.wall_width),
            (
                Vec2::new(self.x - wall_offset, self.y + self.height / 2.0),
                self.wall_width,
                wall_height,
            ),
            (
                Vec2::new(self.x + wall_offset, self.y + self.height / 2.0),
                self.wall_width,
                wall_height,
            ),
        ];

        parts
            .iter()
            .filter_map(|&(pos, width, height)| {
                let body = world.add_static_body(pos);
                world.add_box_shape(body, width, height)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::{Geometry, Space};

    #[test]
    fn test_default_beaker_geometry() {
        let config = GameConfig {
            screen_width: 1000.0,
            screen_height: 600.0,
            ..Default::default()
        };
        let beaker = Beaker::from_config(&config);
        assert!((beaker.x - 500.0).abs() < 1e-3);
        assert!((beaker.y - 100.0).abs() < 1e-3);
        assert!((beaker.width - 800.0).abs() < 1e-3);
        assert!((beaker.height - 400.0).abs() < 1e-3);
        assert!((beaker.wall_width - 15.0).abs() < 1e-3);
        // Rim sits on the overflow line
        assert!((beaker.rim() - config.overflow_line()).abs() < 1e-3);
    }

    #[test]
    fn test_build_adds_three_static_boxes() {
        let config = GameConfig::default();
        let beaker = Beaker::from_config(&config);
        let mut space = Space::default();

        let shapes = beaker.build(&mut space);
        assert_eq!(shapes.len(), 3);
        for shape in shapes {
            assert!(matches!(
                space.shape_geometry(shape),
                Some(Geometry::Rect { .. })
            ));
        }
        assert_eq!(space.body_count(), 3);
    }
}
