use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// What the remote does with each accepted connection.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Echo everything back until the client closes
    Echo,
    /// Write the chunks (with a short pause between them), then close
    Script(Vec<Vec<u8>>),
    /// Record what arrives, never answer
    Sink,
}

/// Plain TCP peer on 127.0.0.1.
pub struct Remote {
    pub port: u16,
    pub data: Arc<Mutex<Vec<Vec<u8>>>>,
    pub accepted: Arc<Mutex<usize>>,
    handle: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl Remote {
    pub async fn spawn(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let data = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(Mutex::new(0));

        let handle = tokio::spawn(Remote::listen(
            listener,
            behavior,
            data.clone(),
            accepted.clone(),
        ));

        Remote {
            port,
            data,
            accepted,
            handle,
        }
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Everything received so far, all connections concatenated
    pub fn received(&self) -> Vec<u8> {
        self.data.lock().unwrap().concat()
    }

    pub fn accepted(&self) -> usize {
        *self.accepted.lock().unwrap()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    async fn listen(
        listener: TcpListener,
        behavior: Behavior,
        data: Arc<Mutex<Vec<Vec<u8>>>>,
        accepted: Arc<Mutex<usize>>,
    ) {
        loop {
            // Wait for a connection
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            *accepted.lock().unwrap() += 1;

            let behavior = behavior.clone();
            let data = data.clone();
            tokio::spawn(async move {
                if let Behavior::Script(chunks) = &behavior {
                    for chunk in chunks {
                        if stream.write_all(chunk).await.is_err() {
                            return;
                        }
                        stream.flush().await.ok();
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                    stream.shutdown().await.ok();
                    return;
                }

                let mut buffer = [0; 8192];
                loop {
                    let n = match stream.read(&mut buffer).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    data.lock().unwrap().push(buffer[..n].to_vec());
                    if let Behavior::Echo = behavior {
                        if stream.write_all(&buffer[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    }
}

impl Drop for Remote {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
