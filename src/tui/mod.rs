pub mod app;
pub mod filter;
pub mod format;
pub mod input;
pub mod popup;
pub mod render;
pub mod state;
