mod head_config;
mod head_options;

pub use head_config::*;
pub use head_options::*;
