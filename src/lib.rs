pub mod core;
pub mod view;
