// Heading-to-instrument angle math.
//
// Axis convention: right-handed, Y up, +Z is the bow reference axis, X points to starboard.
// All angles are degrees. Both instrument views read from one `InstrumentFrame`, so
// azimuth/polar and the projection pair can never disagree for the same heading.

use super::vessel::Vec3;

// Plane magnitudes at or below this (on the unit direction) take the degenerate branch.
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Horizontal bearing and elevation of a heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzimuthPolar {
    /// Bearing from +Z toward +X in [0, 360).
    pub azimuth: f64,
    /// Elevation above the X-Z plane in [-90, 90].
    pub polar: f64,
}

/// Angles of the heading's projections onto the Z-X and Z-Y planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionAngles {
    /// Rotation about +Y from the bow axis, in (-180, 180].
    pub angle_zx: f64,
    /// Rotation about +X from the bow axis, in (-180, 180]. Nose-up reads negative.
    pub angle_yz: f64,
}

/// Unit direction plus the plane magnitudes every instrument angle is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentFrame {
    direction: Vec3,
    // Magnitude of the projection onto the horizontal (Z-X) plane.
    horizontal: f64,
    // Magnitude of the projection onto the Z-Y plane.
    lateral: f64,
}

impl InstrumentFrame {
    /// Normalizes the heading. A zero vector resolves to a zero direction, which every
    /// view reports as all-zero angles.
    pub fn resolve(heading: Vec3) -> Self {
        // Scale by the largest component first so huge finite inputs cannot overflow.
        let scale = heading.x.abs().max(heading.y.abs()).max(heading.z.abs());
        if scale == 0.0 || !scale.is_finite() {
            return Self {
                direction: Vec3::ZERO,
                horizontal: 0.0,
                lateral: 0.0,
            };
        }

        let scaled = Vec3::new(heading.x / scale, heading.y / scale, heading.z / scale);
        let len = scaled.length();
        let direction = Vec3::new(scaled.x / len, scaled.y / len, scaled.z / len);

        Self {
            direction,
            horizontal: direction.x.hypot(direction.z),
            lateral: direction.y.hypot(direction.z),
        }
    }

    pub fn azimuth_polar(&self) -> AzimuthPolar {
        let angle_zx = self.angle_zx();
        let mut azimuth = if angle_zx < 0.0 {
            angle_zx + 360.0
        } else {
            angle_zx
        };
        // Tiny negative angles can round up to exactly 360.
        if azimuth >= 360.0 {
            azimuth = 0.0;
        }

        let polar = if self.horizontal <= DEGENERATE_EPSILON {
            // Straight up or down; zero vector reads as level.
            if self.direction.y > 0.0 {
                90.0
            } else if self.direction.y < 0.0 {
                -90.0
            } else {
                0.0
            }
        } else {
            self.direction.y.atan2(self.horizontal).to_degrees()
        };

        AzimuthPolar {
            azimuth: azimuth + 0.0,
            polar: polar + 0.0,
        }
    }

    pub fn projection_angles(&self) -> ProjectionAngles {
        let angle_yz = if self.lateral <= DEGENERATE_EPSILON {
            0.0
        } else {
            signed_degrees((-self.direction.y).atan2(self.direction.z))
        };

        ProjectionAngles {
            angle_zx: self.angle_zx(),
            angle_yz,
        }
    }

    fn angle_zx(&self) -> f64 {
        if self.horizontal <= DEGENERATE_EPSILON {
            // No horizontal component: bearing is undefined, report the reference bearing.
            return 0.0;
        }
        signed_degrees(self.direction.x.atan2(self.direction.z))
    }
}

/// Azimuth/polar view of a heading.
pub fn azimuth_polar(heading: Vec3) -> AzimuthPolar {
    InstrumentFrame::resolve(heading).azimuth_polar()
}

/// Projection-pair view of a heading.
pub fn projection_angles(heading: Vec3) -> ProjectionAngles {
    InstrumentFrame::resolve(heading).projection_angles()
}

// Radians to degrees in (-180, 180], with -0 folded to 0.
fn signed_degrees(radians: f64) -> f64 {
    let degrees = radians.to_degrees();
    if degrees <= -180.0 {
        degrees + 360.0
    } else {
        degrees + 0.0
    }
}
