pub mod collector;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod finalize;
pub mod layout;
pub mod merge;
pub mod output;
pub mod parser;
pub mod partition;
pub mod pipeline;
pub mod sample;
pub mod segments;
