pub mod catalog;
pub mod definition;
pub mod schema;

pub use catalog::*;
pub use definition::*;
pub use schema::*;
