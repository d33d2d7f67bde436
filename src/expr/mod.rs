pub mod csc;
pub mod normalize;
