pub mod parsing;
pub mod retry;
pub mod time;
