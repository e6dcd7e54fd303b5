mod get_difference;
mod http_transport;
mod logging;
mod table_text;

pub use get_difference::*;
pub use http_transport::*;
pub use logging::*;
pub use table_text::*;
