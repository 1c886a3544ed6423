// The file-system seam. Dictionary and metadata files are only ever
// appended to, truncated, or read whole (or by byte range), so that is all a
// Store has to offer. FileStore is the real thing; MemStore backs the crash
// recovery tests and can be told to refuse truncation.

use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::{BufWriter, Error, ErrorKind, Read, Result, Seek, SeekFrom, Write},
    ops::Range,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

pub trait Writer: Write + Send {
    /// Offset at which the next byte written will land, i.e. the file
    /// length once everything buffered is flushed.
    fn pos(&self) -> u64;
    /// Flush and force to stable storage.
    fn sync(&mut self) -> Result<()>;
}

pub trait Store: Clone + Send + Sync {
    type Writer: Writer;

    fn exists(&self, path: &Path) -> bool;
    fn len(&self, path: &Path) -> Result<u64>;
    fn truncate(&self, path: &Path, len: u64) -> Result<()>;
    /// Opens for appending, creating the file if it doesn't exist.
    fn open_append(&self, path: &Path) -> Result<Self::Writer>;
    fn read_all(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_range(&self, path: &Path, range: Range<u64>) -> Result<Vec<u8>>;
    fn create_dir_all(&self, dir: &Path) -> Result<()>;
}

fn range_len(range: &Range<u64>) -> Result<usize> {
    if range.end < range.start {
        return Err(Error::new(ErrorKind::InvalidInput, "inverted byte range"));
    }
    usize::try_from(range.end - range.start)
        .map_err(|_| Error::new(ErrorKind::InvalidInput, "byte range exceeds usize"))
}

// FileStore

#[derive(Clone, Debug, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        FileStore
    }
}

pub struct FileWriter {
    file: BufWriter<File>,
    path: PathBuf,
    pos: u64,
}

impl FileWriter {
    fn try_open_append(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        let pos = file.metadata()?.len();
        let file = BufWriter::new(file);
        Ok(Self { file, path, pos })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.file.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
    fn flush(&mut self) -> Result<()> {
        self.file.flush()
    }
}

impl Writer for FileWriter {
    fn pos(&self) -> u64 {
        self.pos
    }
    fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_all()
    }
}

impl Store for FileStore {
    type Writer = FileWriter;

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn len(&self, path: &Path) -> Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn truncate(&self, path: &Path, len: u64) -> Result<()> {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(len)?;
        file.sync_all()
    }

    fn open_append(&self, path: &Path) -> Result<FileWriter> {
        FileWriter::try_open_append(path.to_owned())
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn read_range(&self, path: &Path, range: Range<u64>) -> Result<Vec<u8>> {
        let mut buf = vec![0_u8; range_len(&range)?];
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(range.start))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn create_dir_all(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
    }
}

// MemStore

#[derive(Debug, Default)]
struct MemFiles {
    files: BTreeMap<PathBuf, Vec<u8>>,
    fail_truncate: bool,
}

/// An in-memory store. Clones share the same files.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    inner: Arc<Mutex<MemFiles>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> Result<MutexGuard<'_, MemFiles>> {
        self.inner
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "mem store lock poisoned"))
    }

    fn not_found(path: &Path) -> Error {
        Error::new(ErrorKind::NotFound, format!("no such file: {}", path.display()))
    }

    /// Makes every later `truncate` fail, to simulate a file system that
    /// can't shrink files.
    pub fn fail_truncate(&self, fail: bool) -> Result<()> {
        self.files()?.fail_truncate = fail;
        Ok(())
    }

    pub fn put(&self, path: &Path, data: Vec<u8>) -> Result<()> {
        self.files()?.files.insert(path.to_owned(), data);
        Ok(())
    }

    /// Appends raw bytes behind the store's back, the way a crash mid-write
    /// would leave them.
    pub fn append_raw(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.files()?
            .files
            .entry(path.to_owned())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }
}

pub struct MemWriter {
    store: MemStore,
    path: PathBuf,
    pos: u64,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut files = self.store.files()?;
        let file = files
            .files
            .get_mut(&self.path)
            .ok_or_else(|| MemStore::not_found(&self.path))?;
        file.extend_from_slice(buf);
        self.pos = file.len() as u64;
        Ok(buf.len())
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Writer for MemWriter {
    fn pos(&self) -> u64 {
        self.pos
    }
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Store for MemStore {
    type Writer = MemWriter;

    fn exists(&self, path: &Path) -> bool {
        self.files()
            .map(|f| f.files.contains_key(path))
            .unwrap_or(false)
    }

    fn len(&self, path: &Path) -> Result<u64> {
        let files = self.files()?;
        let file = files.files.get(path).ok_or_else(|| Self::not_found(path))?;
        Ok(file.len() as u64)
    }

    fn truncate(&self, path: &Path, len: u64) -> Result<()> {
        let mut files = self.files()?;
        if files.fail_truncate {
            return Err(Error::new(ErrorKind::PermissionDenied, "truncate refused"));
        }
        let file = files
            .files
            .get_mut(path)
            .ok_or_else(|| Self::not_found(path))?;
        let len = usize::try_from(len)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "length exceeds usize"))?;
        file.truncate(len);
        Ok(())
    }

    fn open_append(&self, path: &Path) -> Result<MemWriter> {
        let mut files = self.files()?;
        let pos = files.files.entry(path.to_owned()).or_default().len() as u64;
        Ok(MemWriter {
            store: self.clone(),
            path: path.to_owned(),
            pos,
        })
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files()?;
        files
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn read_range(&self, path: &Path, range: Range<u64>) -> Result<Vec<u8>> {
        let n = range_len(&range)?;
        let files = self.files()?;
        let file = files.files.get(path).ok_or_else(|| Self::not_found(path))?;
        let start = usize::try_from(range.start)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "offset exceeds usize"))?;
        file.get(start..start + n)
            .map(|s| s.to_vec())
            .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "byte range past end of file"))
    }

    fn create_dir_all(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }
}
