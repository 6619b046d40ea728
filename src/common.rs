pub mod clock;
pub mod csv;
pub mod error;
pub mod mime;
pub mod response;
pub mod tokens;
