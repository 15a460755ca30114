mod deepseek;

pub use deepseek::{DeepSeekClient, REMOTE_SOURCE};
