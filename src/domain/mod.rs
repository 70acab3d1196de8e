pub mod draft;
pub mod location;
pub mod order;
pub mod product;

pub use draft::*;
pub use location::*;
pub use order::*;
pub use product::*;
