pub mod create_keys;
pub mod deploy;
pub mod plan;
