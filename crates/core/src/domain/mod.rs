pub mod attribute;
pub mod product;
pub mod requirements;
