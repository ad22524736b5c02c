use std::future::Future;
use std::io;
use std::sync::Mutex;

use log::debug;
use tokio::runtime::{Builder, Handle, Runtime};

use super::consts;

/// Where a socket runs its I/O tasks.
///
/// Either the tokio runtime that was current when the socket was created, or a
/// dedicated single worker runtime started on first use.
#[derive(Debug)]
pub(crate) struct IoContext {
    handle: Mutex<Option<Handle>>,
    owned: Mutex<Option<Runtime>>,
}

impl IoContext {
    pub fn current() -> Self {
        IoContext {
            handle: Mutex::new(Handle::try_current().ok()),
            owned: Mutex::new(None),
        }
    }

    pub fn with_handle(handle: Handle) -> Self {
        IoContext {
            handle: Mutex::new(Some(handle)),
            owned: Mutex::new(None),
        }
    }

    fn handle(&self) -> io::Result<Handle> {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = handle.as_ref() {
            return Ok(handle.clone());
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(consts::IO_THREAD_NAME)
            .enable_all()
            .build()?;
        debug!("Started dedicated I/O runtime");

        let new_handle = runtime.handle().clone();
        *self.owned.lock().unwrap_or_else(|e| e.into_inner()) = Some(runtime);
        *handle = Some(new_handle.clone());
        Ok(new_handle)
    }

    pub fn spawn<F>(&self, future: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle()?.spawn(future);
        Ok(())
    }
}

impl Drop for IoContext {
    fn drop(&mut self) {
        // May run on one of the runtime's own threads, where a plain drop panics
        if let Some(runtime) = self.owned.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            runtime.shutdown_background();
        }
    }
}
