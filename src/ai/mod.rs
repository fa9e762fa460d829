pub mod agent;
pub mod prompt;
pub mod tools;
