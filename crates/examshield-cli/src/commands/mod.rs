pub mod init;
pub mod show_config;
pub mod take;
pub mod validate;
