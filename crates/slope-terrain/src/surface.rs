//! Surface classification of the canyon cross-section.

use serde::{Deserialize, Serialize};

/// What kind of ground a terrain sample lies on, from the centerline outward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// The groomed ride track.
    Track,
    /// The shoulder between track and canyon wall.
    Bank,
    /// Flat canyon floor beyond the bank (only with a configured bank width).
    CanyonFloor,
    /// Steep face of a cliff terrace.
    WallVertical,
    /// Flat step of a cliff terrace.
    WallLedge,
    /// The flat top beyond the canyon wall.
    Plateau,
}

impl SurfaceKind {
    /// All kinds, from the centerline outward.
    pub const ALL: [SurfaceKind; 6] = [
        Self::Track,
        Self::Bank,
        Self::CanyonFloor,
        Self::WallVertical,
        Self::WallLedge,
        Self::Plateau,
    ];

    /// Returns `true` for the two cliff kinds.
    pub fn is_cliff(self) -> bool {
        matches!(self, Self::WallVertical | Self::WallLedge)
    }

    /// Returns `true` where jump ramps are felt.
    pub fn carries_jumps(self) -> bool {
        matches!(self, Self::Track | Self::Bank)
    }

    /// Short lowercase name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Bank => "bank",
            Self::CanyonFloor => "canyon_floor",
            Self::WallVertical => "wall_vertical",
            Self::WallLedge => "wall_ledge",
            Self::Plateau => "plateau",
        }
    }
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cliff_kinds() {
        let cliffs: Vec<_> = SurfaceKind::ALL.iter().filter(|k| k.is_cliff()).collect();
        assert_eq!(cliffs, [&SurfaceKind::WallVertical, &SurfaceKind::WallLedge]);
    }

    #[test]
    fn test_jumps_only_on_track_and_bank() {
        for kind in SurfaceKind::ALL {
            assert_eq!(
                kind.carries_jumps(),
                matches!(kind, SurfaceKind::Track | SurfaceKind::Bank),
                "{kind}"
            );
        }
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<_> = SurfaceKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SurfaceKind::ALL.len());
    }
}
