pub mod calendar;
pub mod config;
pub mod error;
pub mod model;
pub mod plan_api;
pub mod scheduler;
pub mod storage;
pub mod task_list;
pub mod timer;
