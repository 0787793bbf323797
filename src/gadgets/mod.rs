pub mod bits;
pub mod curve;
pub mod field;
pub mod hash;
