pub mod common;
mod game_tests;
