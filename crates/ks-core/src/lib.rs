//! ks-core: shared foundation for kinsens.
//!
//! Contains:
//! - units (uom SI types + constructors, atm and cm/s conversions)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
