pub mod book;
pub mod genre;
pub mod series;

pub use book::*;
pub use genre::*;
pub use series::*;
