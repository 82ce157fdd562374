pub mod client;
pub mod history;
