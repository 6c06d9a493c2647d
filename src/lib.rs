pub mod commands;
pub mod config;
pub mod date;
pub mod filter;
pub mod store;
pub mod task;
pub mod task_detail;
pub mod task_list;
pub mod ui;
