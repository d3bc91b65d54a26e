pub mod common;
mod api_tests;
mod webhook_tests;
