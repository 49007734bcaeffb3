pub mod buffer;
pub mod bus;
pub mod config;
pub mod controller;
pub mod decode;
pub mod log_filter;
pub mod model;
pub mod subscriber;
pub mod view;

// Renderer-neutral text for the terminal UI
pub mod present;
