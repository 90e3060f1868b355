//! Logging shims. Forward to `defmt` or `log` depending on the enabled feature (`defmt` wins if
//! both are on), and expand to nothing when neither is.

#![macro_use]
#![allow(unused_macros)]

macro_rules! trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg)+);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::trace!($($arg)+);
        #[cfg(not(any(feature = "defmt", feature = "log")))]
        let _ = ($($arg)+);
    }};
}

macro_rules! debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)+);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::debug!($($arg)+);
        #[cfg(not(any(feature = "defmt", feature = "log")))]
        let _ = ($($arg)+);
    }};
}

macro_rules! warn {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)+);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::warn!($($arg)+);
        #[cfg(not(any(feature = "defmt", feature = "log")))]
        let _ = ($($arg)+);
    }};
}
