// Each test binary uses a different subset of the helpers
#![allow(dead_code)]

pub mod config;
pub mod observer;
pub mod remote;
pub mod tls_server;
pub mod utils;
