pub mod forms;
pub mod session;
