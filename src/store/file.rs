//! JSON file record store.
//!
//! The whole record list lives in memory while the store is open and is
//! written back after every mutation. Writes go to a sibling temp file which
//! is then renamed over the original, so a crash never leaves half a file.
//! A mutation only reaches the in-memory list once its write has succeeded.
//!
//! Disk access runs on a background thread owned by the store; the async
//! methods wait for its reply instead of blocking the caller's thread.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use futures::channel::oneshot;
use serde_json::Value;

use super::RecordStore;
use super::error::StorageError;
use super::memory::upsert;
use super::record::{RecordFilter, StoredRecord};

/// Message sent to the I/O thread.
enum IoRequest {
    /// Read the file; `None` if it does not exist
    Read {
        path: PathBuf,
        reply: oneshot::Sender<io::Result<Option<String>>>,
    },
    /// Replace the file atomically
    Write {
        path: PathBuf,
        contents: String,
        reply: oneshot::Sender<io::Result<()>>,
    },
    /// Stop the thread
    Shutdown,
}

/// Background thread doing the store's file I/O.
#[derive(Debug)]
struct IoThread {
    request_tx: Sender<IoRequest>,
    thread_handle: Option<JoinHandle<()>>,
}

impl IoThread {
    fn spawn() -> Result<Self, StorageError> {
        let (request_tx, request_rx) = mpsc::channel::<IoRequest>();
        let thread_handle = thread::Builder::new()
            .name("annotation-store-io".to_string())
            .spawn(move || {
                log::debug!("Store I/O thread started");
                Self::thread_loop(request_rx);
                log::debug!("Store I/O thread exiting");
            })?;
        Ok(Self {
            request_tx,
            thread_handle: Some(thread_handle),
        })
    }

    fn thread_loop(request_rx: Receiver<IoRequest>) {
        loop {
            match request_rx.recv() {
                Ok(IoRequest::Read { path, reply }) => {
                    if reply.send(read_file(&path)).is_err() {
                        log::debug!("Read of {:?} finished after the caller left", path);
                    }
                }
                Ok(IoRequest::Write {
                    path,
                    contents,
                    reply,
                }) => {
                    if reply.send(write_file(&path, &contents)).is_err() {
                        log::debug!("Write of {:?} finished after the caller left", path);
                    }
                }
                Ok(IoRequest::Shutdown) | Err(_) => break,
            }
        }
    }

    fn send(&self, request: IoRequest) -> Result<(), StorageError> {
        self.request_tx
            .send(request)
            .map_err(|_| StorageError::WorkerStopped)
    }

    async fn read(&self, path: PathBuf) -> Result<Option<String>, StorageError> {
        let (reply, result) = oneshot::channel();
        self.send(IoRequest::Read { path, reply })?;
        Ok(result.await.map_err(|_| StorageError::WorkerStopped)??)
    }

    async fn write(&self, path: PathBuf, contents: String) -> Result<(), StorageError> {
        let (reply, result) = oneshot::channel();
        self.send(IoRequest::Write {
            path,
            contents,
            reply,
        })?;
        Ok(result.await.map_err(|_| StorageError::WorkerStopped)??)
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            // A send failure means the thread already exited
            let _ = self.request_tx.send(IoRequest::Shutdown);
            if handle.join().is_err() {
                log::warn!("Store I/O thread panicked");
            }
        }
    }
}

impl Drop for IoThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn read_file(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn write_file(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp = path.to_path_buf().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Records persisted as a JSON array on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Vec<StoredRecord>,
    pretty: bool,
    open: bool,
    io: IoThread,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty one if the file is missing.
    ///
    /// Damaged rows load as partially empty records. Only a file that is not
    /// a JSON array at all is `StorageError::Unreadable`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let io = IoThread::spawn()?;
        let records = match io.read(path.clone()).await? {
            Some(text) if !text.trim().is_empty() => {
                let rows: Vec<Value> =
                    serde_json::from_str(&text).map_err(|source| StorageError::Unreadable {
                        path: path.clone(),
                        source,
                    })?;
                rows.into_iter().map(StoredRecord::from_row).collect()
            }
            _ => Vec::new(),
        };
        log::debug!("Opened annotation store {:?} ({} records)", path, records.len());
        Ok(Self {
            path,
            records,
            pretty: false,
            open: true,
            io,
        })
    }

    /// Pretty-print the file on every write.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.open {
            Ok(())
        } else {
            Err(StorageError::Closed)
        }
    }

    /// Write `records` to disk, then make them the current list.
    async fn commit(&mut self, records: Vec<StoredRecord>) -> Result<(), StorageError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(&records)
        } else {
            serde_json::to_string(&records)
        }
        .map_err(StorageError::Encode)?;

        self.io.write(self.path.clone(), json).await?;
        log::trace!("Flushed {} records to {:?}", records.len(), self.path);
        self.records = records;
        Ok(())
    }

    /// Drop records failing `keep` and commit if anything changed.
    async fn retain(
        &mut self,
        keep: impl Fn(&StoredRecord) -> bool,
    ) -> Result<usize, StorageError> {
        self.ensure_open()?;
        let kept: Vec<StoredRecord> = self.records.iter().filter(|r| keep(r)).cloned().collect();
        let removed = self.records.len() - kept.len();
        if removed > 0 {
            self.commit(kept).await?;
        }
        Ok(removed)
    }
}

impl RecordStore for JsonFileStore {
    async fn insert(&mut self, record: StoredRecord) -> Result<(), StorageError> {
        self.ensure_open()?;
        if self.records.iter().any(|r| r.id == record.id) {
            return Err(StorageError::DuplicateId { id: record.id });
        }
        let mut next = self.records.clone();
        next.push(record);
        self.commit(next).await
    }

    async fn put(&mut self, record: StoredRecord) -> Result<(), StorageError> {
        self.ensure_open()?;
        let mut next = self.records.clone();
        upsert(&mut next, record);
        self.commit(next).await
    }

    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        self.ensure_open()?;
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        Ok(self.retain(|r| r.id != id).await? > 0)
    }

    async fn scan(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StorageError> {
        self.ensure_open()?;
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn delete_missing_required(&mut self) -> Result<usize, StorageError> {
        self.retain(|r| r.missing_required_field().is_none()).await
    }

    async fn delete_ids(&mut self, ids: &[String]) -> Result<usize, StorageError> {
        self.retain(|r| !ids.contains(&r.id)).await
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if self.open {
            self.open = false;
            self.records.clear();
            self.io.shutdown();
            log::debug!("Closed annotation store {:?}", self.path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationKind;
    use crate::registry::Label;
    use crate::registry::testing::FakeRegistry;
    use crate::service::AnnotationService;
    use crate::store::encode;
    use crate::store::tests::sample;
    use pollster::block_on;

    fn record(id: &str) -> StoredRecord {
        StoredRecord {
            id: id.into(),
            kind: "keypoint".into(),
            label_id: "l".into(),
            image_id: "i".into(),
            project_id: "p".into(),
            payload: "{}".into(),
            ..Default::default()
        }
    }

    fn ids(store: &JsonFileStore) -> Vec<String> {
        block_on(store.scan(&RecordFilter::All))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = block_on(JsonFileStore::open(&path)).unwrap();
        block_on(store.put(record("a"))).unwrap();
        block_on(store.insert(record("b"))).unwrap();
        block_on(store.delete("a")).unwrap();
        block_on(store.close()).unwrap();

        let store = block_on(JsonFileStore::open(&path)).unwrap();
        assert_eq!(ids(&store), vec!["b"]);
    }

    #[test]
    fn test_insert_rejects_taken_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = block_on(JsonFileStore::open(dir.path().join("s.json"))).unwrap();
        block_on(store.insert(record("a"))).unwrap();
        assert!(matches!(
            block_on(store.insert(record("a"))),
            Err(StorageError::DuplicateId { .. })
        ));
        assert_eq!(ids(&store), vec!["a"]);
    }

    #[test]
    fn test_damaged_rows_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"[{"id":"x","type":"polygon"},{"id":"y"},17]"#).unwrap();

        let mut store = block_on(JsonFileStore::open(&path)).unwrap();
        assert_eq!(block_on(store.scan(&RecordFilter::All)).unwrap().len(), 3);
        assert_eq!(block_on(store.delete_missing_required()).unwrap(), 3);
    }

    #[test]
    fn test_null_and_object_fields_are_skipped_and_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let good = sample(AnnotationKind::Polygon);
        let mut null_label = serde_json::to_value(encode(&good).unwrap()).unwrap();
        null_label["id"] = "null-label".into();
        null_label["labelId"] = Value::Null;
        let mut object_payload = serde_json::to_value(encode(&good).unwrap()).unwrap();
        object_payload["id"] = "object-payload".into();
        object_payload["payload"] = serde_json::json!({"type": "polygon"});
        let rows = vec![
            serde_json::to_value(encode(&good).unwrap()).unwrap(),
            null_label,
            object_payload,
        ];
        fs::write(&path, serde_json::to_string(&rows).unwrap()).unwrap();

        let store = block_on(JsonFileStore::open(&path)).unwrap();
        let mut svc =
            AnnotationService::new(store, FakeRegistry::with_label(Label::new("label-1", "car")));
        assert_eq!(block_on(svc.list_by_image("image-1")).unwrap(), vec![good.clone()]);
        assert_eq!(block_on(svc.list_by_project("project-1")).unwrap().len(), 1);

        assert_eq!(block_on(svc.repair_corrupted()).unwrap(), 2);
        assert_eq!(block_on(svc.repair_corrupted()).unwrap(), 0);
        block_on(svc.close()).unwrap();

        let store = block_on(JsonFileStore::open(&path)).unwrap();
        assert_eq!(ids(&store), vec![good.id]);
    }

    #[test]
    fn test_failed_write_leaves_records_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = block_on(JsonFileStore::open(&path)).unwrap();
        block_on(store.put(record("a"))).unwrap();

        // A directory in the temp file's place makes every write fail
        fs::create_dir(dir.path().join("store.json.tmp")).unwrap();

        assert!(matches!(
            block_on(store.put(record("b"))),
            Err(StorageError::Io(_))
        ));
        assert!(block_on(store.delete("a")).is_err());
        assert!(block_on(store.delete_ids(&["a".to_string()])).is_err());
        assert_eq!(ids(&store), vec!["a"]);

        let on_disk = block_on(JsonFileStore::open(&path)).unwrap();
        assert_eq!(ids(&on_disk), ids(&store));
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            block_on(JsonFileStore::open(&path)),
            Err(StorageError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_closed_store_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = block_on(JsonFileStore::open(dir.path().join("s.json"))).unwrap();
        block_on(store.close()).unwrap();
        assert!(matches!(
            block_on(store.put(record("a"))),
            Err(StorageError::Closed)
        ));
    }
}
