mod cursor;
mod pagination;
mod repository;

pub use cursor::*;
pub use pagination::*;
pub use repository::*;
