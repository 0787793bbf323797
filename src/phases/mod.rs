use plonky2::plonk::config::{GenericConfig, PoseidonGoldilocksConfig};

pub mod accumulator;
pub mod blinding;
pub mod exponent;
pub mod intersection;
pub mod witness;

pub const D: usize = 2;
pub type C = PoseidonGoldilocksConfig;
pub type F = <C as GenericConfig<D>>::F;
