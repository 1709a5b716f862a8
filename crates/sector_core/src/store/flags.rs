//! # Object Flag Bits
//!
//! Flags are stored as raw `u32` columns so the solver and the scan can test
//! them without conversion.

/// Entity flag bits.
pub mod entity {
    /// Marked for removal by the next delete scan.
    pub const DELETED: u32 = 1;
    /// Grounded and allowed to jump.
    pub const CAN_JUMP: u32 = 1 << 1;
    /// Facing left.
    pub const FACE_LEFT: u32 = 1 << 2;
    /// Touching liquid.
    pub const IS_WET: u32 = 1 << 3;
    /// Left the active sector; extracted by egress.
    pub const SECTOR_OUT: u32 = 1 << 4;
    /// Mid attack animation.
    pub const ATTACKING: u32 = 1 << 5;
    /// Destroyed; reported through the broken object buffer.
    pub const BROKEN: u32 = 1 << 6;
    /// Able to pick up collectable entities.
    pub const CAN_COLLECT: u32 = 1 << 7;
    /// Picked up; reported through the collected object buffer.
    pub const COLLECTED: u32 = 1 << 8;
    /// Can be picked up.
    pub const COLLECTABLE: u32 = 1 << 9;
    /// Ghost state active.
    pub const GHOST_ACTIVE: u32 = 1 << 10;
}

/// Hull flag bits.
pub mod hull {
    /// Never moves.
    pub const IS_STATIC: u32 = 1;
    /// Circle collision shape.
    pub const IS_CIRCLE: u32 = 1 << 1;
    /// Polygon collision shape.
    pub const IS_POLYGON: u32 = 1 << 2;
    /// Not driven by any bone.
    pub const NO_BONES: u32 = 1 << 3;
    /// Outside the sector bounds.
    pub const OUT_OF_BOUNDS: u32 = 1 << 4;
    /// Detects contacts without resolving them.
    pub const IS_SENSOR: u32 = 1 << 5;
    /// Foot sensor of a character.
    pub const IS_FOOT: u32 = 1 << 6;
    /// Left side sensor.
    pub const SIDE_L: u32 = 1 << 7;
    /// Right side sensor.
    pub const SIDE_R: u32 = 1 << 8;
    /// Liquid particle.
    pub const IS_LIQUID: u32 = 1 << 9;
    /// Submerged in liquid.
    pub const IN_LIQUID: u32 = 1 << 10;
    /// Touching a hull with the same material.
    pub const TOUCH_ALIKE: u32 = 1 << 11;
    /// Terrain block.
    pub const IS_BLOCK: u32 = 1 << 12;
    /// Organic material.
    pub const IS_ORGANIC: u32 = 1 << 13;
    /// Inside the sector perimeter.
    pub const IN_PERIMETER: u32 = 1 << 14;
    /// Block cursor.
    pub const IS_CURSOR: u32 = 1 << 15;
    /// Under the block cursor.
    pub const CURSOR_OVER: u32 = 1 << 16;
    /// Hand of a character.
    pub const IS_HAND: u32 = 1 << 17;
    /// Within interaction range.
    pub const IN_RANGE: u32 = 1 << 18;
    /// Hit by the cursor this tick.
    pub const CURSOR_HIT: u32 = 1 << 19;
    /// Non-colliding ghost hull.
    pub const GHOST_HULL: u32 = 1 << 20;
    /// Head of a character.
    pub const IS_HEAD: u32 = 1 << 21;
    /// A sensor registered a hit this tick.
    pub const SENSOR_HIT: u32 = 1 << 22;
}

/// Point flag bits.
pub mod point {
    /// Interior point (not on the hull boundary).
    pub const INTERIOR: u32 = 1;
    /// Collided with a floor this tick.
    pub const HIT_FLOOR: u32 = 1 << 1;
    /// Collided with a wall this tick.
    pub const HIT_WALL: u32 = 1 << 2;
    /// Liquid flow direction.
    pub const FLOW_LEFT: u32 = 1 << 3;
    /// In a dense liquid region.
    pub const HIGH_DENSITY: u32 = 1 << 4;
}

/// Edge flag bits.
pub mod edge {
    /// Interior cross-brace edge.
    pub const INTERIOR: u32 = 1;
    /// Edge belongs to a sensor hull.
    pub const SENSOR: u32 = 1 << 1;
}

/// Returns true when every bit of `mask` is set in `flags`.
#[inline]
#[must_use]
pub const fn has(flags: u32, mask: u32) -> bool {
    flags & mask == mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_bits_are_distinct() {
        let bits = [
            entity::DELETED,
            entity::CAN_JUMP,
            entity::FACE_LEFT,
            entity::IS_WET,
            entity::SECTOR_OUT,
            entity::ATTACKING,
            entity::BROKEN,
            entity::CAN_COLLECT,
            entity::COLLECTED,
            entity::COLLECTABLE,
            entity::GHOST_ACTIVE,
        ];
        let mut seen = 0u32;
        for bit in bits {
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(seen & bit, 0);
            seen |= bit;
        }
    }

    #[test]
    fn test_has() {
        let flags = entity::SECTOR_OUT | entity::IS_WET;
        assert!(has(flags, entity::SECTOR_OUT));
        assert!(!has(flags, entity::DELETED));
        assert!(!has(flags, entity::SECTOR_OUT | entity::DELETED));
    }
}
