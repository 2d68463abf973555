//! Data model shared by the views and the backend client.

mod alert;
mod dataset;
mod upload;

pub use alert::*;
pub use dataset::*;
pub use upload::*;
