pub mod ask;
pub mod retrieve;
pub mod utils;
pub mod validate;
