//! Key and element traits.
//!
//! An element is an unsigned machine word whose low bytes are the key and
//! whose remaining high bytes, if any, are an opaque payload. [`ElementBits`]
//! provides the word-level bit operations the partitioners need,
//! [`RadixKey`] carries the per-key-type sort policy (bit range, partition
//! directions, comparison rank), and [`Keyed`] ties the two together by
//! extracting the key bits out of an element.

/// Unsigned word that the partitioners move and test.
///
/// Implemented for `u8` through `u128`. The partitioners only ever build a
/// single-bit mask and test it, so this is deliberately minimal.
pub trait ElementBits: Copy + Eq + Send + Sync + 'static {
    const BITS: u32;
    const ZERO: Self;

    /// All-zero word with only `bit_no` set.
    fn bit(bit_no: u32) -> Self;

    /// True when `self & mask` is zero.
    fn masked_zero(self, mask: Self) -> bool;
}

macro_rules! element_bits {
    ($($t:ty),*) => {
        $(
            impl ElementBits for $t {
                const BITS: u32 = <$t>::BITS;
                const ZERO: Self = 0;

                #[inline(always)]
                fn bit(bit_no: u32) -> Self {
                    1 << bit_no
                }

                #[inline(always)]
                fn masked_zero(self, mask: Self) -> bool {
                    self & mask == 0
                }
            }
        )*
    };
}

element_bits!(u8, u16, u32, u64, u128);

/// Partition directions for one descent: the direction used on the top
/// (sign) bit and the directions used for the two halves below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Directions {
    pub high: bool,
    pub left: bool,
    pub right: bool,
}

/// Sort policy of a key type.
///
/// `Bits` is the unsigned word holding the key's bit pattern. The policy maps
/// the requested direction `up` to per-bit partition directions and provides
/// a total-order rank for the comparison fallback:
///
///  * unsigned keys partition every bit in the requested direction;
///  * two's-complement keys flip the direction on the sign bit, whose meaning
///    is inverted relative to the magnitude bits;
///  * sign-magnitude floats flip the sign bit as well, and then sort the
///    negative half downward and the positive half upward, since the
///    magnitude bits of negative values are stored in natural order.
pub trait RadixKey: Copy + Send + Sync + 'static {
    type Bits: ElementBits + Ord;

    /// Highest key bit, `8 * size_of::<Bits>() - 1`.
    const MSB: u32 = <Self::Bits as ElementBits>::BITS - 1;

    fn directions(up: bool) -> Directions;

    /// Bit pattern remapped so that unsigned comparison of ranks matches the
    /// sort order of the keys. For floats this is the bitwise total order
    /// (−NaN < −∞ < … < −0.0 < +0.0 < … < +∞ < +NaN), which keeps the
    /// comparison fallback consistent with the bitwise partitioning for
    /// every input, NaNs included.
    fn to_ordered(bits: Self::Bits) -> Self::Bits;
}

macro_rules! unsigned_key {
    ($($t:ty => $bits:ty),*) => {
        $(
            impl RadixKey for $t {
                type Bits = $bits;

                #[inline(always)]
                fn directions(up: bool) -> Directions {
                    Directions { high: up, left: up, right: up }
                }

                #[inline(always)]
                fn to_ordered(bits: $bits) -> $bits {
                    bits
                }
            }
        )*
    };
}

macro_rules! signed_key {
    ($($t:ty => $bits:ty),*) => {
        $(
            impl RadixKey for $t {
                type Bits = $bits;

                #[inline(always)]
                fn directions(up: bool) -> Directions {
                    Directions { high: !up, left: up, right: up }
                }

                #[inline(always)]
                fn to_ordered(bits: $bits) -> $bits {
                    bits ^ (1 << (<$bits>::BITS - 1))
                }
            }
        )*
    };
}

unsigned_key!(u8 => u8, u16 => u16, u32 => u32, u64 => u64);
signed_key!(i8 => u8, i16 => u16, i32 => u32, i64 => u64);

impl RadixKey for f32 {
    type Bits = u32;

    #[inline(always)]
    fn directions(up: bool) -> Directions {
        Directions {
            high: !up,
            left: false,
            right: true,
        }
    }

    #[inline(always)]
    fn to_ordered(bits: u32) -> u32 {
        // see f32::total_cmp
        (bits ^ (((bits as i32) >> 31) as u32 >> 1)) ^ (1 << 31)
    }
}

impl RadixKey for f64 {
    type Bits = u64;

    #[inline(always)]
    fn directions(up: bool) -> Directions {
        Directions {
            high: !up,
            left: false,
            right: true,
        }
    }

    #[inline(always)]
    fn to_ordered(bits: u64) -> u64 {
        // see f64::total_cmp
        (bits ^ (((bits as i64) >> 63) as u64 >> 1)) ^ (1 << 63)
    }
}

/// Element word carrying a key of type `K` in its low bytes.
///
/// Implemented for the bare key word (no payload) and for the word twice the
/// key's width (key plus same-sized payload). The partitioners move the whole
/// element; only the comparison fallback looks at the extracted key bits.
pub trait Keyed<K: RadixKey>: ElementBits {
    fn key_bits(self) -> K::Bits;
}

macro_rules! keyed {
    ($($k:ty => $bits:ty: $($e:ty),*;)*) => {
        $($(
            impl Keyed<$k> for $e {
                #[inline(always)]
                fn key_bits(self) -> $bits {
                    self as $bits
                }
            }
        )*)*
    };
}

keyed!(
    u8 => u8: u8, u16;
    i8 => u8: u8, u16;
    u16 => u16: u16, u32;
    i16 => u16: u16, u32;
    u32 => u32: u32, u64;
    i32 => u32: u32, u64;
    f32 => u32: u32, u64;
    u64 => u64: u64, u128;
    i64 => u64: u64, u128;
    f64 => u64: u64, u128;
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_picks_the_right_half_of_u128() {
        assert_eq!(<u128 as ElementBits>::bit(3), 1u128 << 3);
        assert_eq!(<u128 as ElementBits>::bit(64), 1u128 << 64);
        assert_eq!(<u128 as ElementBits>::bit(127), 1u128 << 127);
    }

    #[test]
    fn signed_rank_orders_across_zero() {
        let ranks: Vec<u32> = [-5i32, -1, 0, 1, 5]
            .iter()
            .map(|v| <i32 as RadixKey>::to_ordered(*v as u32))
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn float_rank_is_bitwise_total_order() {
        let values = [
            -f32::NAN,
            f32::NEG_INFINITY,
            -1.5f32,
            -0.0,
            0.0,
            1.5,
            f32::INFINITY,
            f32::NAN,
        ];
        let ranks: Vec<u32> = values
            .iter()
            .map(|v| <f32 as RadixKey>::to_ordered(v.to_bits()))
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn float_directions_split_the_halves() {
        let up = <f32 as RadixKey>::directions(true);
        assert_eq!(
            up,
            Directions {
                high: false,
                left: false,
                right: true
            }
        );
        let down = <f32 as RadixKey>::directions(false);
        assert_eq!(
            down,
            Directions {
                high: true,
                left: false,
                right: true
            }
        );
    }

    #[test]
    fn payload_is_ignored_by_key_extraction() {
        let e: u64 = 0xdead_beef_0000_002a;
        assert_eq!(<u64 as Keyed<u32>>::key_bits(e), 0x0000_002a);
    }
}
