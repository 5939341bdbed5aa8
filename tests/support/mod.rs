pub mod croprec_env;
pub mod crops;
