mod info;
mod install;

pub use info::cmd_info;
pub use install::cmd_install;
