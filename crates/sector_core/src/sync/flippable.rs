//! Front/back pair flipped once per tick.

/// Two instances of `T`: the driver writes the front, consumers read the back.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut out = Flippable::new(UnorderedSectorOutput::default(), UnorderedSectorOutput::default());
/// out.front_mut().egress(&mut sector, &counts.objects)?;
/// out.flip();
/// let batch = out.back().unload();
/// ```
#[derive(Clone, Debug, Default)]
pub struct Flippable<T> {
    sides: [T; 2],
    front: usize,
    flips: u64,
}

impl<T> Flippable<T> {
    /// Creates a pair from its two sides.
    #[must_use]
    pub fn new(front: T, back: T) -> Self {
        Self {
            sides: [front, back],
            front: 0,
            flips: 0,
        }
    }

    /// Side the driver writes.
    #[inline]
    #[must_use]
    pub fn front(&self) -> &T {
        &self.sides[self.front]
    }

    /// Side the driver writes.
    #[inline]
    pub fn front_mut(&mut self) -> &mut T {
        &mut self.sides[self.front]
    }

    /// Side consumers read: the front as of the last flip.
    #[inline]
    #[must_use]
    pub fn back(&self) -> &T {
        &self.sides[self.front ^ 1]
    }

    /// Mutable back side.
    #[inline]
    pub fn back_mut(&mut self) -> &mut T {
        &mut self.sides[self.front ^ 1]
    }

    /// Trades front and back.
    pub fn flip(&mut self) {
        self.front ^= 1;
        self.flips += 1;
    }

    /// Number of flips so far.
    #[inline]
    #[must_use]
    pub const fn flips(&self) -> u64 {
        self.flips
    }
}

impl<T: Clone> Flippable<T> {
    /// Creates a pair with two copies of `value`.
    #[must_use]
    pub fn splat(value: T) -> Self {
        Self::new(value.clone(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_exposes_last_front() {
        let mut pair = Flippable::splat(Vec::<u32>::new());
        pair.front_mut().push(1);
        assert!(pair.back().is_empty());

        pair.flip();
        assert_eq!(pair.back(), &vec![1]);
        assert!(pair.front().is_empty());

        pair.front_mut().push(2);
        pair.flip();
        assert_eq!(pair.back(), &vec![2]);
        assert_eq!(pair.front(), &vec![1]);
        assert_eq!(pair.flips(), 2);
    }
}
