pub mod pending_seed;
pub mod source;
