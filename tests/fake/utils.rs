use std::time::Duration;

// Get a free port, so we can run multiple tests
#[allow(dead_code)]
pub fn find_free_port(listen_address: Option<&str>) -> u16 {
    let listen_address = listen_address.unwrap_or("127.0.0.1");
    match std::net::TcpListener::bind(format!("{}:0", listen_address)) {
        Ok(listener) => {
            let addr = listener.local_addr().unwrap();
            addr.port()
        }
        Err(e) => {
            panic!("Error binding listener: {:?}", e);
        }
    }
}

/// Poll `condition` every 10ms until it holds or `limit` passes.
#[allow(dead_code)]
pub async fn wait_until<F: FnMut() -> bool>(limit: Duration, mut condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Same as [`wait_until`], for tests running without a tokio runtime.
#[allow(dead_code)]
pub fn wait_until_blocking<F: FnMut() -> bool>(limit: Duration, mut condition: F) -> bool {
    let deadline = std::time::Instant::now() + limit;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
