pub mod discover;
pub mod excel_read;
pub mod excel_write;
pub mod legacy;
pub mod package;
pub mod styles;
pub mod validate;
mod xml;
