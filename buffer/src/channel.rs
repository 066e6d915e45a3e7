//! Buffer channels and entity kinds.

/// A named per-row buffer carried by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Channel {
    /// Vertex or instance positions (xyz).
    Positions = 0,
    /// Vertex normals (xyz).
    Normals = 1,
    /// Vertex or instance colors (rgb).
    Colors = 2,
    /// Instance rotations as quaternions (xyzw).
    Rotations = 3,
    /// Per-layer opacity.
    Opacity = 4,
    /// Per-layer visibility (0.0 hidden, 1.0 shown).
    Visibility = 5,
}

impl Channel {
    /// Number of channels.
    pub const COUNT: usize = 6;

    /// All channels in wire order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Positions,
        Self::Normals,
        Self::Colors,
        Self::Rotations,
        Self::Opacity,
        Self::Visibility,
    ];

    /// Index into per-channel arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Bit used for this channel in a channel mask.
    #[must_use]
    pub const fn flag(self) -> u8 {
        1 << (self as u8)
    }

    /// Column count every buffer of this channel must have.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Positions | Self::Normals | Self::Colors => 3,
            Self::Rotations => 4,
            Self::Opacity | Self::Visibility => 1,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Positions => "positions",
            Self::Normals => "normals",
            Self::Colors => "colors",
            Self::Rotations => "rotations",
            Self::Opacity => "opacity",
            Self::Visibility => "visibility",
        }
    }

    /// Returns the channel for an index, if valid.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Channels present in a mask, in wire order.
    pub fn from_mask(mask: u8) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(move |channel| mask & channel.flag() != 0)
    }

    /// Mask with every channel bit set.
    #[must_use]
    pub const fn full_mask() -> u8 {
        (1 << Self::COUNT) - 1
    }
}

/// The kind of scene object a command history belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum EntityKind {
    /// A base mesh whose vertex buffer is animated.
    Mesh = 1,
    /// An instanced mesh whose per-instance transforms are animated.
    InstancedMesh = 2,
    /// A frame whose per-layer settings are animated.
    Frame = 3,
}

impl EntityKind {
    /// Parses an entity kind from its raw byte.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Mesh),
            2 => Some(Self::InstancedMesh),
            3 => Some(Self::Frame),
            _ => None,
        }
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mesh => "mesh",
            Self::InstancedMesh => "instanced_mesh",
            Self::Frame => "frame",
        }
    }

    /// Returns `true` if commands for this kind may carry `channel`.
    #[must_use]
    pub const fn allows(self, channel: Channel) -> bool {
        matches!(
            (self, channel),
            (
                Self::Mesh,
                Channel::Positions | Channel::Normals | Channel::Colors
            ) | (
                Self::InstancedMesh,
                Channel::Positions | Channel::Rotations | Channel::Colors
            ) | (Self::Frame, Channel::Opacity | Channel::Visibility)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_distinct_bits() {
        let mut seen = 0u8;
        for channel in Channel::ALL {
            assert_eq!(seen & channel.flag(), 0);
            seen |= channel.flag();
        }
        assert_eq!(seen, Channel::full_mask());
    }

    #[test]
    fn mask_roundtrip_preserves_order() {
        let mask = Channel::Colors.flag() | Channel::Positions.flag();
        let channels: Vec<_> = Channel::from_mask(mask).collect();
        assert_eq!(channels, vec![Channel::Positions, Channel::Colors]);
    }

    #[test]
    fn index_roundtrip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_index(channel.index()), Some(channel));
        }
        assert_eq!(Channel::from_index(Channel::COUNT), None);
    }

    #[test]
    fn widths() {
        assert_eq!(Channel::Positions.width(), 3);
        assert_eq!(Channel::Rotations.width(), 4);
        assert_eq!(Channel::Opacity.width(), 1);
    }

    #[test]
    fn entity_kind_channel_rules() {
        assert!(EntityKind::Mesh.allows(Channel::Normals));
        assert!(!EntityKind::Mesh.allows(Channel::Rotations));
        assert!(EntityKind::InstancedMesh.allows(Channel::Rotations));
        assert!(!EntityKind::InstancedMesh.allows(Channel::Normals));
        assert!(EntityKind::Frame.allows(Channel::Visibility));
        assert!(!EntityKind::Frame.allows(Channel::Positions));
    }

    #[test]
    fn entity_kind_raw_roundtrip() {
        for kind in [EntityKind::Mesh, EntityKind::InstancedMesh, EntityKind::Frame] {
            assert_eq!(EntityKind::from_raw(kind.raw()), Some(kind));
        }
        assert_eq!(EntityKind::from_raw(0), None);
    }
}
