pub mod category;
pub mod path;
