pub mod ai;
pub mod calendar;
pub mod chat;
pub mod cli;
pub mod core;
pub mod google;
pub mod openai;
