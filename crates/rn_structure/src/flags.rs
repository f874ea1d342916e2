use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use serde::{Serialize, Deserialize};

/// A small bitmask shared by molecule types, species and reaction
/// classes. Each bit has a fixed meaning, see the associated constants.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flags(u32);

impl Flags {
    pub const EMPTY: Flags = Flags(0);

    pub const SURF: Flags = Flags(1 << 0);
    pub const REACTIVE_SURFACE: Flags = Flags(1 << 1);
    pub const ONE_MOL_NO_COMPONENTS: Flags = Flags(1 << 2);
    pub const TARGET_ONLY: Flags = Flags(1 << 3);

    pub const CAN_VOLVOL: Flags = Flags(1 << 4);
    pub const CAN_VOLSURF: Flags = Flags(1 << 5);
    pub const CAN_VOLWALL: Flags = Flags(1 << 6);
    pub const CAN_SURFSURF: Flags = Flags(1 << 7);
    pub const CAN_REGION_BORDER: Flags = Flags(1 << 8);
    pub const HAS_UNIMOL_RXN: Flags = Flags(1 << 9);
    pub const HAS_BIMOL_VOL_RXN: Flags = Flags(1 << 10);

    pub const COUNTED_IN_WORLD: Flags = Flags(1 << 16);
    pub const COUNTED_IN_VOLUME_REGIONS: Flags = Flags(1 << 17);
    pub const COUNTED_ON_SURFACE_REGIONS: Flags = Flags(1 << 18);

    /// Flags that are recomputed whenever the reaction network changes.
    pub const RXN_FLAGS: Flags = Flags(
        Self::CAN_VOLVOL.0 | Self::CAN_VOLSURF.0 | Self::CAN_VOLWALL.0 |
        Self::CAN_SURFSURF.0 | Self::CAN_REGION_BORDER.0 |
        Self::HAS_UNIMOL_RXN.0 | Self::HAS_BIMOL_VOL_RXN.0
    );

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Flags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Flags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Flags, value: bool) {
        if value {
            self.insert(other)
        } else {
            self.remove(other)
        }
    }

    pub fn is_surf(self) -> bool {
        self.contains(Flags::SURF)
    }

    pub fn is_reactive_surface(self) -> bool {
        self.contains(Flags::REACTIVE_SURFACE)
    }

    pub fn is_vol(self) -> bool {
        !self.is_surf() && !self.is_reactive_surface()
    }

    pub fn has_unimol_rxn(self) -> bool {
        self.contains(Flags::HAS_UNIMOL_RXN)
    }

    pub fn has_bimol_vol_rxn(self) -> bool {
        self.contains(Flags::HAS_BIMOL_VOL_RXN)
    }

    pub fn is_simple(self) -> bool {
        self.contains(Flags::ONE_MOL_NO_COMPONENTS)
    }

    pub fn cant_initiate(self) -> bool {
        self.contains(Flags::TARGET_ONLY)
    }
}

const NAMED_FLAGS: [(Flags, &str); 14] = [
    (Flags::SURF, "SURF"),
    (Flags::REACTIVE_SURFACE, "REACTIVE_SURFACE"),
    (Flags::ONE_MOL_NO_COMPONENTS, "ONE_MOL_NO_COMPONENTS"),
    (Flags::TARGET_ONLY, "TARGET_ONLY"),
    (Flags::CAN_VOLVOL, "CAN_VOLVOL"),
    (Flags::CAN_VOLSURF, "CAN_VOLSURF"),
    (Flags::CAN_VOLWALL, "CAN_VOLWALL"),
    (Flags::CAN_SURFSURF, "CAN_SURFSURF"),
    (Flags::CAN_REGION_BORDER, "CAN_REGION_BORDER"),
    (Flags::HAS_UNIMOL_RXN, "HAS_UNIMOL_RXN"),
    (Flags::HAS_BIMOL_VOL_RXN, "HAS_BIMOL_VOL_RXN"),
    (Flags::COUNTED_IN_WORLD, "COUNTED_IN_WORLD"),
    (Flags::COUNTED_IN_VOLUME_REGIONS, "COUNTED_IN_VOLUME_REGIONS"),
    (Flags::COUNTED_ON_SURFACE_REGIONS, "COUNTED_ON_SURFACE_REGIONS"),
];

impl BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = NAMED_FLAGS.iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "(0x{:x})", self.0)
        } else {
            write!(f, "{} (0x{:x})", names.join(", "), self.0)
        }
    }
}
