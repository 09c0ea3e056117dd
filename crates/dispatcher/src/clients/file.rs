//! FileClient - appends JSON lines, one file per destination

use bytes::Bytes;
use contracts::{BrokerClient, BrokerConnection, ClientProperties, ContractError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, instrument};

use super::Envelope;

/// Client writing under the directory named by `bootstrap.servers`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileClient;

impl FileClient {
    pub fn new() -> Self {
        Self
    }
}

impl BrokerClient for FileClient {
    type Connection = FileConnection;

    fn kind(&self) -> &'static str {
        "file"
    }

    #[instrument(name = "file_client_open", skip(self, properties))]
    async fn open(&self, properties: &ClientProperties) -> Result<FileConnection, ContractError> {
        let base = properties
            .address()
            .filter(|address| !address.trim().is_empty())
            .ok_or_else(|| ContractError::broker_connection("", "missing output directory"))?;

        let base_path = PathBuf::from(base);
        fs::create_dir_all(&base_path)
            .map_err(|e| ContractError::broker_connection(base, e.to_string()))?;

        debug!(base_path = %base_path.display(), "FileClient opened");
        Ok(FileConnection {
            base_path,
            files: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }
}

/// Open output files keyed by destination
///
/// Writes are serialized by the mutex so lines from concurrent workers never
/// interleave.
#[derive(Debug)]
pub struct FileConnection {
    base_path: PathBuf,
    files: Mutex<HashMap<String, File>>,
    closed: AtomicBool,
}

impl FileConnection {
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File that holds a destination's messages
    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.jsonl", sanitize(destination)))
    }

    fn append(&self, destination: &str, line: &[u8]) -> std::io::Result<()> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        let file = match files.entry(destination.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.path_for(destination))?,
            ),
        };
        file.write_all(line)?;
        file.write_all(b"\n")
    }
}

fn sanitize(destination: &str) -> String {
    destination
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

impl BrokerConnection for FileConnection {
    #[instrument(
        name = "file_connection_send",
        skip(self, payload),
        fields(bytes = payload.len())
    )]
    async fn send(&self, destination: &str, payload: &Bytes) -> Result<(), ContractError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ContractError::broker_send(destination, "connection closed"));
        }

        let line = serde_json::to_vec(&Envelope::new(destination, payload))
            .map_err(|e| ContractError::broker_send(destination, format!("json error: {e}")))?;

        self.append(destination, &line).map_err(|e| {
            error!(destination = %destination, error = %e, "Append failed");
            ContractError::broker_send(destination, e.to_string())
        })
    }

    #[instrument(name = "file_connection_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        self.closed.store(true, Ordering::Release);
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, file) in files.drain() {
            file.sync_all()?;
        }
        debug!(base_path = %self.base_path.display(), "FileClient closed");
        Ok(())
    }
}
