pub mod backup;
pub mod clear;
pub mod context;
pub mod history;
pub mod init;
pub mod process;
pub mod reflect;
pub mod stats;
pub mod threads;
pub mod version;
