pub mod audio;
pub mod error;
pub mod probe;
pub mod render;
pub mod tools;
pub mod transcribe;
