pub mod agent;
pub mod check;
pub mod history;
pub mod watch;
