pub mod completion;
pub mod config;
pub mod convert;
pub mod doctor;
pub mod info;
pub mod version;
