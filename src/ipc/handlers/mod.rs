pub mod blocks;
pub mod choices;
pub mod core;
pub mod directory;
pub mod log;
pub mod offerings;
