pub mod category;
pub mod storage;

pub use category::Category;
