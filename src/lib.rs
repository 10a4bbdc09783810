pub mod camera;
pub mod config;
pub mod osc;
pub mod pipeline;
pub mod pose;
pub mod render;
