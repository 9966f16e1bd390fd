pub mod arb;
pub mod bluestein;
pub mod ftt;
pub mod ntt;
