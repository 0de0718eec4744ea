//! Grid layout of dice inside an auto-sized tray, and camera framing.

use glam::{Vec2, Vec3};

/// Distance between neighbouring grid slots.
pub const SLOT_SPACING: f32 = 2.4;
pub const WALL_HEIGHT: f32 = 1.6;
/// Clearance between the highest spawn point and the tray lid.
pub const LID_HEADROOM: f32 = 3.0;
const MIN_WIDTH: f32 = 10.0;
const MIN_DEPTH: f32 = 8.0;
/// Room around the grid on each axis.
const PADDING: f32 = 4.0;

/// Camera placement derived from tray size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

/// Grid and tray dimensions for a die count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrayLayout {
    pub count: usize,
    pub columns: usize,
    pub rows: usize,
    pub spacing: f32,
    /// Tray extent along X.
    pub width: f32,
    /// Tray extent along Z.
    pub depth: f32,
    pub wall_height: f32,
}

impl TrayLayout {
    pub fn for_count(count: usize) -> Self {
        let n = count.max(1);
        let columns = ((n as f32).sqrt().ceil() as usize).clamp(1, n);
        let rows = n.div_ceil(columns);
        Self {
            count,
            columns,
            rows,
            spacing: SLOT_SPACING,
            width: (columns as f32 * SLOT_SPACING + PADDING).max(MIN_WIDTH),
            depth: (rows as f32 * SLOT_SPACING + PADDING).max(MIN_DEPTH),
            wall_height: WALL_HEIGHT,
        }
    }

    /// Centre of grid slot `index` on the tray floor.
    pub fn slot(&self, index: usize) -> Vec2 {
        let col = index % self.columns;
        let row = index / self.columns;
        let offset_x = (self.columns - 1) as f32 * self.spacing / 2.0;
        let offset_z = (self.rows - 1) as f32 * self.spacing / 2.0;
        Vec2::new(
            col as f32 * self.spacing - offset_x,
            row as f32 * self.spacing - offset_z,
        )
    }

    pub fn slots(&self) -> impl Iterator<Item = Vec2> + '_ {
        (0..self.count).map(|i| self.slot(i))
    }

    /// Horizontal region dice may spawn in, `margin` away from the walls.
    pub fn spawn_bounds(&self, margin: f32) -> (Vec2, Vec2) {
        let half = Vec2::new(self.width, self.depth) / 2.0;
        let inset = (half - Vec2::splat(margin)).max(Vec2::ZERO);
        (-inset, inset)
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width, self.depth) / 2.0
    }

    /// Larger of the two tray dimensions.
    pub fn size(&self) -> f32 {
        self.width.max(self.depth)
    }

    pub fn camera(&self) -> CameraRig {
        let size = self.size();
        let distance = (size * 0.75).max(8.0);
        let height = (size * 0.45).max(4.6);
        CameraRig {
            position: Vec3::new(0.0, height, distance),
            target: Vec3::ZERO,
            fov_degrees: if size > 14.0 { 55.0 } else { 48.0 },
            min_distance: (distance * 0.7).max(5.0),
            max_distance: distance * 1.6,
        }
    }
}
