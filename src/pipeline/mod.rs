pub mod controller;
pub mod runner;
pub mod state;
