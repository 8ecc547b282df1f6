pub mod add;
pub mod check;
pub mod clear;
pub mod common;
pub mod completions;
pub mod export;
pub mod import;
pub mod info;
pub mod list;
pub mod remove;
pub mod rename;
pub mod stats;
pub mod sync;
