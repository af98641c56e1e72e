pub mod core;
pub mod promotion;
pub mod sessions;
pub mod students;
