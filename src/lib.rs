pub mod cli;
pub mod config;
pub mod dns;
pub mod hosts;
pub mod pipeline;
pub mod probe;
pub mod rank;
pub mod utils;

pub use config::*;
pub use dns::*;
pub use hosts::*;
pub use pipeline::*;
pub use probe::*;
pub use rank::*;
pub use utils::*;
