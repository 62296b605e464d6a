pub mod config_cmd;
pub mod fetch_cmd;
pub mod gateway;
pub mod status;
