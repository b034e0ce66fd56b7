pub mod data;
pub mod load;
pub mod ops;
