pub mod activities;
pub mod assignments;
pub mod categories;
pub mod core;
pub mod teams;
pub mod users;
