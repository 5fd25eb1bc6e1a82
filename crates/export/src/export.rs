use crate::error::{ErrorKind, Result};
use crate::name::{build_name, folder_name, pad_width};
use crate::resolve;
use crate::sink::{ArchiveSink, SinkGuard};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use mediapack_cache::{ExportStat, MediaRecord, Repository};
use mediapack_sniff::{PeekableReader, SNIFF_LENGTH, resolve_extension};
use mediapack_storage::BlobHandle;
use std::io::Read;
use tracing::instrument;

pub const DEFAULT_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Number of records fetched from the cache per query. Zero is treated
    /// as one.
    pub page_size: u64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE }
    }
}

/// Position of an item within the whole export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Items handled so far, including this one and any skipped.
    pub processed: u64,
    pub total: u64,
}

/// What happened to a single media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Written to the archive at `path` (`<folder>/<name>`).
    Exported { name: String, path: String, bytes: u64 },
    /// Left out of the archive. `name` is what the entry would have been
    /// called, based on the declared type and URL alone.
    Skipped { name: String, reason: String },
}

impl ItemOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Exported { name, .. } | Self::Skipped { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub exported: u64,
    pub skipped: u64,
}

/// Progress events emitted by [`export`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once, with the cache totals.
/// 2. [`Item`](Self::Item): once per cached media item, exported or skipped.
/// 3. [`Complete`](Self::Complete): exactly once, after the archive has been
///    finalized.
///
/// A fatal error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Started(ExportStat),
    Item { progress: Progress, outcome: ItemOutcome },
    Complete(Summary),
}

/// Streams [`ExportEvent`]s while packing every cached media item into
/// `sink`, one entry per item under a folder named after its feed.
///
/// The cache is read page by page (`options.page_size` records at a time),
/// and items are handled strictly one after another. Items whose content is
/// missing or unreadable are reported as [`ItemOutcome::Skipped`] and the
/// export carries on; cache and archive failures end the stream with an
/// `Err`.
///
/// The sink is owned by the stream and finalized exactly once: before
/// [`Complete`](ExportEvent::Complete), before a fatal error is yielded, or
/// when the stream is dropped part-way.
pub fn export<'a, S: ArchiveSink + 'a>(
    cache: &'a Repository,
    blobs: &'a BlobHandle,
    sink: S,
    options: ExportOptions,
) -> impl Stream<Item = Result<ExportEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let mut guard = SinkGuard::new(sink);
        let page_size = options.page_size.max(1);

        let stat = match cache.stat().await.or_raise(|| ErrorKind::Cache) {
            Ok(stat) => stat,
            Err(e) => {
                guard.abort();
                yield Err(e);
                return;
            },
        };
        if stat.count == 0 {
            guard.abort();
            yield Err(exn::Exn::from(ErrorKind::EmptyCache));
            return;
        }
        tracing::info!(count = stat.count, total_size = stat.total_size, "exporting cached media");
        yield Ok(ExportEvent::Started(stat));

        let width = pad_width(stat.max_id);
        let mut processed = 0;
        let mut summary = Summary::default();
        let mut offset = 0;
        while offset < stat.count {
            let groups = match cache.page(offset, page_size).await.or_raise(|| ErrorKind::Cache) {
                Ok(groups) => groups,
                Err(e) => {
                    guard.abort();
                    yield Err(e);
                    return;
                },
            };
            for group in &groups {
                let folder = folder_name(&group.label);
                for record in &group.medias {
                    processed += 1;
                    let outcome = match process_item(record, &folder, width, blobs, guard.sink_mut()).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            guard.abort();
                            yield Err(e);
                            return;
                        },
                    };
                    match outcome {
                        ItemOutcome::Exported { .. } => summary.exported += 1,
                        ItemOutcome::Skipped { .. } => summary.skipped += 1,
                    }
                    let progress = Progress { processed, total: stat.count };
                    yield Ok(ExportEvent::Item { progress, outcome });
                }
            }
            offset += page_size;
        }

        if let Err(e) = guard.finish() {
            yield Err(e);
            return;
        }
        tracing::info!(exported = summary.exported, skipped = summary.skipped, "export complete");
        yield Ok(ExportEvent::Complete(summary));
    })
}

/// Export a single media item into `sink` under `folder`.
///
/// The content is opened once: its head is peeked for byte sniffing, then
/// replayed together with the rest into the archive entry.
///
/// # Errors
/// Only fatal errors are returned ([`Archive`](ErrorKind::Archive)); a
/// missing or unreadable source becomes [`ItemOutcome::Skipped`], including
/// one that fails part-way through its entry, which is then discarded.
#[instrument(level = "debug", skip_all, fields(id = record.id, folder = %folder))]
pub async fn process_item<S: ArchiveSink + ?Sized>(
    record: &MediaRecord,
    folder: &str,
    pad_width: usize,
    blobs: &BlobHandle,
    sink: &mut S,
) -> Result<ItemOutcome> {
    let skipped = |reason: String| -> Result<ItemOutcome> {
        let extension = resolve_extension(&record.content_type, &record.url, None);
        let name = build_name(record.id, pad_width, &extension, &record.url, record.created_at);
        tracing::warn!(id = record.id, name = %name, reason = %reason, "skipping media");
        Ok(ItemOutcome::Skipped { name, reason })
    };

    let source = match resolve::open(record, &**blobs).await {
        Ok(source) => source,
        Err(e) if e.is_recoverable() => return skipped((*e).to_string()),
        Err(e) => return Err(e),
    };
    let size = source.size();
    let mut reader = PeekableReader::new(source);
    let extension = match reader.peek(SNIFF_LENGTH) {
        Ok(prefix) => resolve_extension(&record.content_type, &record.url, Some(prefix)),
        Err(e) => return skipped((*e).to_string()),
    };
    let name = build_name(record.id, pad_width, &extension, &record.url, record.created_at);
    let path = format!("{folder}/{name}");
    let mut source = SourceReader::new(reader.into_reader());
    match sink.append(&path, record.created_at, size, &mut source) {
        Ok(bytes) => {
            tracing::debug!(path = %path, bytes, "exported media");
            Ok(ItemOutcome::Exported { name, path, bytes })
        },
        Err(e) => match source.failure {
            Some(failure) => {
                sink.discard()?;
                skipped(format!("read failed: {failure}"))
            },
            None => Err(e),
        },
    }
}

/// Keeps the first read error of the source, so that a failed append can be
/// told apart from a failed archive write.
struct SourceReader<R> {
    inner: R,
    failure: Option<std::io::Error>,
}

impl<R> SourceReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, failure: None }
    }
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.inner.read(buf) {
            Err(e) if e.kind() != std::io::ErrorKind::Interrupted => {
                let reported = std::io::Error::new(e.kind(), e.to_string());
                self.failure.get_or_insert(e);
                Err(reported)
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{Compression, ZipSink};
    use futures::StreamExt;
    use mediapack_cache::Database;
    use mediapack_cache::fixtures::{NewMedia, Seeder};
    use mediapack_storage::backend::MockBlobStore;
    use mediapack_storage::hash_url;
    use async_trait::async_trait;
    use mediapack_storage::{BlobStore, OpenBlob};
    use rstest::rstest;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use time::UtcDateTime;
    use time::macros::utc_datetime;

    const CREATED: UtcDateTime = utc_datetime!(2024-01-02 10:00);
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";

    #[derive(Default)]
    struct Recorded {
        entries: Vec<(String, Vec<u8>)>,
        discarded: usize,
        finished: usize,
    }

    /// Records entries in memory; optionally fails on the n-th append.
    #[derive(Clone, Default)]
    struct FakeSink {
        state: Arc<Mutex<Recorded>>,
        fail_on_append: Option<usize>,
    }
    impl FakeSink {
        fn paths(&self) -> Vec<String> {
            self.state.lock().unwrap().entries.iter().map(|(path, _)| path.clone()).collect()
        }
        fn finished(&self) -> usize {
            self.state.lock().unwrap().finished
        }
    }
    impl ArchiveSink for FakeSink {
        fn append(&mut self, path: &str, _modified: UtcDateTime, _size: u64, reader: &mut dyn Read) -> Result<u64> {
            let mut state = self.state.lock().unwrap();
            if self.fail_on_append == Some(state.entries.len()) {
                exn::bail!(ErrorKind::Archive);
            }
            let mut data = Vec::new();
            reader.read_to_end(&mut data).or_raise(|| ErrorKind::Archive)?;
            let bytes = data.len() as u64;
            state.entries.push((path.to_string(), data));
            Ok(bytes)
        }
        fn discard(&mut self) -> Result<()> {
            self.state.lock().unwrap().discarded += 1;
            Ok(())
        }
        fn finish(&mut self) -> Result<()> {
            self.state.lock().unwrap().finished += 1;
            Ok(())
        }
    }

    struct Fixture {
        db: Database,
        repo: Repository,
        blobs: BlobHandle,
        store: Arc<MockBlobStore>,
        seeder: Seeder,
    }

    async fn fixture() -> Fixture {
        let db = Database::connect_in_memory().await.unwrap();
        let store = Arc::new(MockBlobStore::new());
        Fixture {
            repo: Repository::from(&db),
            seeder: Seeder::from(&db),
            blobs: store.clone(),
            store,
            db,
        }
    }

    impl Fixture {
        /// Blob-tier media linked to a new entry in `feed`, with its content
        /// present in the blob store unless `content` is `None`.
        async fn blob_media(&self, feed: Option<&str>, url: &str, content: Option<&[u8]>) -> i64 {
            let id = self.seeder.media(NewMedia::blob(url).created_at(CREATED)).await.unwrap();
            if let Some(feed) = feed {
                let entry = self.seeder.entry(feed).await.unwrap();
                self.seeder.link(entry, id).await.unwrap();
            }
            if let Some(content) = content {
                self.store.insert(hash_url(url), content.to_vec()).await.unwrap();
            }
            id
        }

        async fn run(&self, sink: impl ArchiveSink + 'static, page_size: u64) -> Vec<Result<ExportEvent>> {
            export(&self.repo, &self.blobs, sink, ExportOptions { page_size }).collect().await
        }
    }

    fn items(events: &[Result<ExportEvent>]) -> Vec<(Progress, ItemOutcome)> {
        events
            .iter()
            .filter_map(|event| match event {
                Ok(ExportEvent::Item { progress, outcome }) => Some((*progress, outcome.clone())),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_cache() {
        let fx = fixture().await;
        // Known to the cache but never downloaded: still nothing to export.
        fx.seeder.media(NewMedia::blob("https://x.test/a.png").uncached()).await.unwrap();
        let sink = FakeSink::default();
        let events = fx.run(sink.clone(), 100).await;
        assert_eq!(events.len(), 1);
        let err = events[0].as_ref().unwrap_err();
        assert_eq!(**err, ErrorKind::EmptyCache);
        assert!(sink.paths().is_empty());
        assert_eq!(sink.finished(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_is_skipped() {
        let fx = fixture().await;
        fx.blob_media(Some("Cats"), "https://x.test/a.png", Some(PNG)).await;
        fx.blob_media(Some("Cats"), "https://x.test/b.png", None).await;
        fx.blob_media(Some("Cats"), "https://x.test/c.png", Some(PNG)).await;
        let sink = FakeSink::default();
        let events = fx.run(sink.clone(), 100).await;

        assert!(matches!(&events[0], Ok(ExportEvent::Started(stat)) if stat.count == 3));
        let items = items(&events);
        let processed: Vec<u64> = items.iter().map(|(progress, _)| progress.processed).collect();
        assert_eq!(processed, [1, 2, 3]);
        assert!(items.iter().all(|(progress, _)| progress.total == 3));
        assert!(matches!(
            &items[1].1,
            ItemOutcome::Skipped { name, reason } if name == "2-2024-01-02-b.png" && reason.contains("not found")
        ));
        assert_eq!(sink.paths(), ["Cats/1-2024-01-02-a.png", "Cats/3-2024-01-02-c.png"]);
        assert!(matches!(events.last(), Some(Ok(ExportEvent::Complete(Summary { exported: 2, skipped: 1 })))));
        assert_eq!(sink.finished(), 1);
    }

    #[tokio::test]
    async fn test_names_and_folders() {
        let fx = fixture().await;
        // Declared type wins over URL and bytes.
        let inline = NewMedia::inline("https://x.test/pic.gif", PNG).mime("image/jpeg").created_at(CREATED);
        let first = fx.seeder.media(inline).await.unwrap();
        let entry = fx.seeder.entry("News/World").await.unwrap();
        fx.seeder.link(entry, first).await.unwrap();
        // Magic bytes when neither type nor URL help; orphans go to `_unsorted`.
        fx.blob_media(None, "https://x.test/image.php?id=3", Some(PNG)).await;
        // Nothing recognizable at all.
        fx.blob_media(None, "https://x.test/notes", Some(b"plain text")).await;

        let sink = FakeSink::default();
        let events = fx.run(sink.clone(), 100).await;
        assert!(events.iter().all(Result::is_ok));
        assert_eq!(
            sink.paths(),
            [
                "News_World/1-2024-01-02-pic.jpg",
                "_unsorted/2-2024-01-02-image.png",
                "_unsorted/3-2024-01-02-notes",
            ]
        );
        let state = sink.state.lock().unwrap();
        assert_eq!(state.entries[0].1, PNG, "content is copied in full after sniffing");
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    #[case(0)]
    #[tokio::test]
    async fn test_paging(#[case] page_size: u64) {
        let fx = fixture().await;
        for n in 1..=5 {
            fx.blob_media(Some("Feed"), &format!("https://x.test/{n}.gif"), Some(b"GIF89a")).await;
        }
        let sink = FakeSink::default();
        let events = fx.run(sink.clone(), page_size).await;
        let processed: Vec<u64> = items(&events).iter().map(|(progress, _)| progress.processed).collect();
        assert_eq!(processed, [1, 2, 3, 4, 5]);
        assert_eq!(sink.paths().len(), 5);
        assert_eq!(sink.finished(), 1);
    }

    #[tokio::test]
    async fn test_archive_failure_is_fatal() {
        let fx = fixture().await;
        for n in 1..=3 {
            fx.blob_media(Some("Feed"), &format!("https://x.test/{n}.gif"), Some(b"GIF89a")).await;
        }
        let sink = FakeSink { fail_on_append: Some(1), ..FakeSink::default() };
        let events = fx.run(sink.clone(), 100).await;
        assert_eq!(items(&events).len(), 1);
        let err = events.last().unwrap().as_ref().unwrap_err();
        assert_eq!(**err, ErrorKind::Archive);
        assert_eq!(sink.paths().len(), 1);
        assert_eq!(sink.finished(), 1);
    }

    #[tokio::test]
    async fn test_cache_failure_is_fatal() {
        let fx = fixture().await;
        fx.blob_media(Some("Feed"), "https://x.test/a.gif", Some(b"GIF89a")).await;
        fx.db.close().await;
        let sink = FakeSink::default();
        let events = fx.run(sink.clone(), 100).await;
        assert_eq!(events.len(), 1);
        assert_eq!(**events[0].as_ref().unwrap_err(), ErrorKind::Cache);
        assert_eq!(sink.finished(), 1);
    }

    #[tokio::test]
    async fn test_dropping_stream_finalizes_sink() {
        let fx = fixture().await;
        for n in 1..=3 {
            fx.blob_media(Some("Feed"), &format!("https://x.test/{n}.gif"), Some(b"GIF89a")).await;
        }
        let sink = FakeSink::default();
        {
            let mut stream = std::pin::pin!(export(&fx.repo, &fx.blobs, sink.clone(), ExportOptions::default()));
            assert!(matches!(stream.next().await, Some(Ok(ExportEvent::Started(_)))));
            assert!(matches!(stream.next().await, Some(Ok(ExportEvent::Item { .. }))));
            assert_eq!(sink.finished(), 0);
        }
        assert_eq!(sink.paths().len(), 1);
        assert_eq!(sink.finished(), 1);
    }

    #[tokio::test]
    async fn test_zip_archive_end_to_end() {
        let fx = fixture().await;
        fx.blob_media(Some("Cats"), "https://x.test/a%20b.JPG?x=1", Some(b"\xff\xd8\xff\xe0")).await;
        fx.blob_media(Some("Dogs"), "https://x.test/missing.png", None).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        let file = std::fs::File::create(&path).unwrap();
        let events = fx.run(ZipSink::new(file, Compression::Deflated), 100).await;
        assert!(matches!(events.last(), Some(Ok(ExportEvent::Complete(Summary { exported: 1, skipped: 1 })))));

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_name("Cats/1-2024-01-02-a b.jpg").unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"\xff\xd8\xff\xe0");
    }

    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from_raw_os_error(5))
        }
    }

    /// Every blob yields 400 good bytes, then an I/O error.
    struct FlakyStore;
    #[async_trait]
    impl BlobStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn open(&self, _hash: &str) -> mediapack_storage::error::Result<OpenBlob> {
            let reader = Cursor::new(vec![0x47; 400]).chain(Broken);
            Ok(OpenBlob { reader: Box::new(reader), size: 800 })
        }
    }

    /// A blob that breaks mid-read, followed by a healthy inline item.
    async fn flaky_fixture() -> (Fixture, BlobHandle) {
        let fx = fixture().await;
        fx.blob_media(Some("Cats"), "https://x.test/a.gif", None).await;
        let inline = fx.seeder.media(NewMedia::inline("https://x.test/b.gif", b"GIF89a").created_at(CREATED)).await.unwrap();
        let entry = fx.seeder.entry("Cats").await.unwrap();
        fx.seeder.link(entry, inline).await.unwrap();
        (fx, Arc::new(FlakyStore))
    }

    #[tokio::test]
    async fn test_source_failing_mid_read_is_skipped() {
        let (fx, blobs) = flaky_fixture().await;
        let sink = FakeSink::default();
        let events: Vec<_> = export(&fx.repo, &blobs, sink.clone(), ExportOptions::default()).collect().await;

        assert!(events.iter().all(Result::is_ok));
        let items = items(&events);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].0, Progress { processed: 2, total: 2 });
        assert!(matches!(
            &items[0].1,
            ItemOutcome::Skipped { name, reason } if name == "1-2024-01-02-a.gif" && reason.starts_with("read failed")
        ));
        assert_eq!(sink.paths(), ["Cats/2-2024-01-02-b.gif"]);
        assert!(matches!(events.last(), Some(Ok(ExportEvent::Complete(Summary { exported: 1, skipped: 1 })))));
        let state = sink.state.lock().unwrap();
        assert_eq!(state.discarded, 1);
        assert_eq!(state.finished, 1);
    }

    #[rstest]
    #[case(Compression::Stored)]
    #[case(Compression::Deflated)]
    #[tokio::test]
    async fn test_zip_drops_entry_of_failing_source(#[case] compression: Compression) {
        let (fx, blobs) = flaky_fixture().await;
        let mut sink = ZipSink::new(Cursor::new(Vec::new()), compression);
        let events: Vec<_> = export(&fx.repo, &blobs, &mut sink, ExportOptions::default()).collect().await;
        assert!(matches!(events.last(), Some(Ok(ExportEvent::Complete(Summary { exported: 1, skipped: 1 })))));

        let bytes = sink.into_inner().unwrap().into_inner();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        let mut data = Vec::new();
        archive.by_name("Cats/2-2024-01-02-b.gif").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"GIF89a");
    }
}
