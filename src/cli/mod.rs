pub mod alloc;
pub mod summary;
pub mod ui;
