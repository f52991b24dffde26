pub mod loader;
pub mod prepare;
pub mod table;
