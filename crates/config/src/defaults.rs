//! Default values applied when config keys are omitted.

pub fn default_enabled() -> bool {
    true
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    8080
}

pub fn default_fee_rate() -> String {
    "0.001".to_string()
}

pub fn default_worker_count() -> usize {
    4
}

pub fn default_queue_capacity() -> usize {
    1024
}

pub fn default_broadcast_delay_ms() -> u64 {
    5000
}

pub fn default_reconcile_interval_seconds() -> u64 {
    30
}

pub fn default_settling_timeout_seconds() -> u64 {
    120
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}
