use std::time::Duration;

pub const VERSION: &str = "v0.1.0";

pub const CONFIGFILE: &str = "/etc/tlssocket.conf";
pub const CONFIGFILE_DEBUG: &str = "tlssocket.conf";

pub const DEFAULT_PORT: u16 = 443;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const READ_BUFFER_SIZE: usize = 16 * 1024;

// Bounds applied to configured values
pub const MIN_READ_BUFFER_SIZE: usize = 512;
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;
pub const MIN_CONNECT_TIMEOUT: f32 = 0.1;
pub const MAX_CONNECT_TIMEOUT: f32 = 120.0;

pub const IO_THREAD_NAME: &str = "tlssocket-io";
