pub mod fixed_window;
pub mod models;
pub mod ports;
