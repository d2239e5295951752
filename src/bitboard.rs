//! A fixed-size bitboard implementation using const generics.
//!
//! Boards are represented as an `N×N` grid packed into an unsigned integer
//! `T`. The game uses [`Grid`] (`u128`, 10×10) for ship occupancy, hit and
//! fired-at masks.

use core::fmt;
use core::mem;
use core::ops::{BitAnd, BitOr, Not};

use num_traits::{PrimInt, Unsigned, Zero};

use crate::config::BOARD_SIZE;
use crate::coord::Coord;

/// The 10×10 board mask used throughout the crate.
pub type Grid = BitBoard<u128, { BOARD_SIZE as usize }>;

/// A fixed-size N×N bitboard stored in the unsigned integer `T`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitBoard<T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    bits: T,
}

impl<T, const N: usize> BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    /// Number of usable bits in the board (`N * N`).
    const BOARD_BITS: usize = N * N;

    #[inline]
    fn mask() -> T {
        if Self::BOARD_BITS >= mem::size_of::<T>() * 8 {
            !T::zero()
        } else {
            (T::one() << Self::BOARD_BITS) - T::one()
        }
    }

    #[inline]
    fn bit(coord: Coord) -> Option<T> {
        let (r, c) = (coord.row as usize, coord.col as usize);
        if r < N && c < N {
            Some(T::one() << (r * N + c))
        } else {
            None
        }
    }

    /// Create a new empty bitboard (all bits cleared).
    #[inline]
    pub fn new() -> Self {
        BitBoard { bits: T::zero() }
    }

    /// Returns the number of set cells.
    pub fn count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Returns true if no cells are set.
    pub fn is_empty(&self) -> bool {
        self.bits.is_zero()
    }

    /// Whether `coord` is set. Off-board coordinates are never set.
    pub fn contains(&self, coord: Coord) -> bool {
        Self::bit(coord).is_some_and(|b| !(self.bits & b).is_zero())
    }

    /// Set `coord`, returning `true` if it was not already set.
    pub fn insert(&mut self, coord: Coord) -> bool {
        match Self::bit(coord) {
            Some(b) if (self.bits & b).is_zero() => {
                self.bits = self.bits | b;
                true
            }
            _ => false,
        }
    }

    /// Iterator over the set cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..N)
            .flat_map(|r| (0..N).map(move |c| (r, c)))
            .filter_map(|(r, c)| {
                Some(Coord {
                    row: u8::try_from(r).ok()?,
                    col: u8::try_from(c).ok()?,
                })
            })
            .filter(move |c| self.contains(*c))
    }
}

impl<T, const N: usize> Default for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> FromIterator<Coord> for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self {
        let mut board = Self::new();
        for c in iter {
            board.insert(c);
        }
        board
    }
}

impl<T, const N: usize> BitAnd for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        BitBoard {
            bits: self.bits & rhs.bits,
        }
    }
}

impl<T, const N: usize> BitOr for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        BitBoard {
            bits: self.bits | rhs.bits,
        }
    }
}

impl<T, const N: usize> Not for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn not(self) -> Self {
        BitBoard {
            bits: !self.bits & Self::mask(),
        }
    }
}

impl<T, const N: usize> fmt::Debug for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitBoard<{}>:", N)?;
        for r in 0..N {
            for c in 0..N {
                let bit = if ((self.bits >> (r * N + c)) & T::one()) != T::zero() {
                    '■'
                } else {
                    '□'
                };
                write!(f, "{} ", bit)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
