pub mod session;

pub use session::{ChatSession, GREETING, Turn};
