// Core trading domain entities and value objects
pub mod position;
pub mod types;
