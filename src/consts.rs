//! Protocol constants for the xiaoi.com ask endpoint.

/// Realm mixed into HA1.
pub const REALM: &str = "xiaoi.com";

/// HTTP method used for every ask call, also mixed into HA2.
pub const METHOD: &str = "POST";

/// Request path, also mixed into HA2.
pub const URI: &str = "/ask.do";

/// Full endpoint URL.
pub const REQ_URL: &str = "http://nlp.xiaoi.com/ask.do";

/// Separator between the fields of every hashed string.
pub const DELIMITER: &str = ":";

/// Length of a generated nonce in hex characters.
pub const NONCE_SIZE: usize = 40;

pub const AUTH_HEADER: &str = "X-Auth";
pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 1;
