pub mod cli;
pub mod commands;
pub mod features;
pub mod indel;
pub mod model;
pub mod profile;
pub mod utils;
