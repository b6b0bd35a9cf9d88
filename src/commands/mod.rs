pub mod convert;
pub mod init;
pub mod shorten;

pub use convert::{execute_convert, ConvertResult};
pub use init::{execute_init, InitResult};
pub use shorten::{execute_shorten, ShortenResult};

#[cfg(feature = "cli")]
pub use convert::print_convert_summary;
#[cfg(feature = "cli")]
pub use init::print_init_summary;
#[cfg(feature = "cli")]
pub use shorten::print_shorten_summary;
