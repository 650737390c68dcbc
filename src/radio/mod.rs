pub mod config;
pub mod driver;
pub mod hal;
pub mod mailbox;
pub mod registers;
pub mod status;
