pub mod summary;
pub mod view;
