use core::convert::Infallible;

/// Single-bit access on the byte being shifted onto or off the wire. Bit 7 goes first.
pub(crate) trait BitsExt {
    fn set(self, shift: u8) -> Self;
    fn check(self, shift: u8) -> bool;
}

impl BitsExt for u8 {
    #[inline(always)]
    fn set(self, shift: u8) -> Self {
        self | (1 << shift)
    }

    #[inline(always)]
    fn check(self, shift: u8) -> bool {
        self & (1 << shift) != 0
    }
}

/// Unwraps results from pins that cannot fail.
#[inline(always)]
pub(crate) fn infallible<T>(res: Result<T, Infallible>) -> T {
    match res {
        Ok(val) => val,
        Err(never) => match never {},
    }
}
