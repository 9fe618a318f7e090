pub mod core;
pub mod forms;
pub mod records;
pub mod reference;
pub mod setup;
