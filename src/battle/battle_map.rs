//! Arena bounds
//!
//! The arena is a square of `size` tiles with the origin in one corner.
//! Buildings sit anywhere inside; troops may only be dropped inside.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattleMap {
    pub size: f32,
}

impl BattleMap {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.size / 2.0, self.size / 2.0)
    }

    /// Is the point inside the arena (edges included)?
    pub fn contains(&self, point: Vec2) -> bool {
        (0.0..=self.size).contains(&point.x) && (0.0..=self.size).contains(&point.y)
    }
}
