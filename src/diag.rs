//! Diagnostics
//!
//! Log macros for the DSP core. On target they expand to `defmt`, on host
//! builds to the `log` facade. Format strings must stay within the subset
//! both understand: `{}` for numbers and `{:?}` for enums.

/// Warning-level diagnostic
macro_rules! diag_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        defmt::warn!($($arg)*);
        #[cfg(all(feature = "std", not(feature = "embedded")))]
        log::warn!($($arg)*);
    }};
}

/// Info-level diagnostic
macro_rules! diag_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        defmt::info!($($arg)*);
        #[cfg(all(feature = "std", not(feature = "embedded")))]
        log::info!($($arg)*);
    }};
}

/// Debug-level diagnostic
macro_rules! diag_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        defmt::debug!($($arg)*);
        #[cfg(all(feature = "std", not(feature = "embedded")))]
        log::debug!($($arg)*);
    }};
}

pub(crate) use {diag_debug, diag_info, diag_warn};
