pub mod app_config;
pub mod utils;
pub mod zoom_to;
