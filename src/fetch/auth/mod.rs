mod api_key;

pub use api_key::{ApiKey, MASHAPE_KEY_HEADER};
