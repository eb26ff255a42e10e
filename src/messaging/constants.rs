pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;
pub const MIN_RETRY_DELAY_SECS: u64 = 5;

pub const RETRY_DELAY_ENV: &str = "PUSH_RETRY_DELAY_SECS";
pub const LOG_LEVEL_ENV: &str = "PUSH_LOG_LEVEL";
pub const TOKEN_CACHE_DIR_ENV: &str = "PUSH_TOKEN_CACHE_DIR";

pub const TOPIC_PREFIX: &str = "/topics/";
pub const MAX_TOPIC_NAME_LEN: usize = 900;

pub const LOCAL_TOKEN_LEN: usize = 32;
