//! Initial layout hints for newly inserted nodes.
//!
//! Positions only keep a force-directed renderer from starting with every
//! node stacked on the origin. They carry no meaning and are assigned once.

use uuid::Uuid;

/// Draws positions uniformly from `[-extent, extent]` on each axis.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    extent: f64,
}

impl Layout {
    pub fn new(extent: f64) -> Self {
        Self {
            extent: extent.abs(),
        }
    }

    /// A fresh random position, one independent draw per axis.
    pub fn place(&self) -> (f64, f64, f64) {
        (
            self.scale(random_u32()),
            self.scale(random_u32()),
            self.scale(random_u32()),
        )
    }

    fn scale(&self, sample: u32) -> f64 {
        let unit = sample as f64 / u32::MAX as f64;
        (unit * 2.0 - 1.0) * self.extent
    }
}

/// uuid is already a dependency and there is no `rand` in the tree; the low
/// 32 bits of a v4 UUID are all random (version and variant bits live higher
/// up).
fn random_u32() -> u32 {
    Uuid::new_v4().as_u128() as u32
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(600.0)
    }
}
