pub mod report;
pub mod smtp;
pub mod templates;
