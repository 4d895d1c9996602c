pub mod aggregate;
pub mod attachments;
pub mod classify;
pub mod config;
pub mod error;
pub mod io;
pub mod measure;
pub mod model;
pub mod notes;
pub mod output;
pub mod pipeline;
pub mod projection;
pub mod report;
pub mod route;
pub mod scid;

pub use error::{Result, ToolError};
