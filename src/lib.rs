//! Call web endpoints by operation id, without an HTTP round-trip.
//!

pub use pontoon_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use pontoon_internal::prelude::*;
}
