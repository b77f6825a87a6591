pub mod geodesy;
pub mod position;
pub mod trip;
