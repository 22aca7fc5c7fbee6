//! Conditionally parallel iteration.
//!
//! With the `parallel` feature these expand to rayon iterators, otherwise to
//! plain std ones. Call sites need `rayon::prelude::*` in scope under the
//! same feature gate. Both forms must produce identical results, so only use
//! them for order-preserving maps and collects.

/// Conditionally parallel iterator over a slice.
macro_rules! maybe_par_iter {
    ($slice:expr) => {{
        #[cfg(feature = "parallel")]
        {
            $slice.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $slice.iter()
        }
    }};
}

/// Conditionally parallel mutable iterator over a slice.
macro_rules! maybe_par_iter_mut {
    ($slice:expr) => {{
        #[cfg(feature = "parallel")]
        {
            $slice.par_iter_mut()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $slice.iter_mut()
        }
    }};
}

pub(crate) use maybe_par_iter;
pub(crate) use maybe_par_iter_mut;
