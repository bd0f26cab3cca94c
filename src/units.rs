//! Physical quantities that are used within power data objects.
pub use uom::si::f32::{ElectricCurrent, ElectricPotential, Power};
