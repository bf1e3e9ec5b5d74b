pub mod catalog;
pub mod error;
pub mod filters;
pub mod options;
pub mod subtitles;
pub mod types;
