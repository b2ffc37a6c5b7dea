//! Reading track bytes from disk, and opening network streams.

use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use lofty::prelude::*;
use lofty::probe::Probe;

use crate::error::{Error, Result};

const CHUNK_SIZE: usize = 16 * 1024;
/// Chunks buffered ahead of the decoder.
const READ_AHEAD: usize = 32;

/// Load a local file fully into memory.
pub(super) fn read_file(path: &Path) -> Result<Arc<[u8]>> {
    fs::read(path)
        .map(Arc::from)
        .map_err(|e| Error::PlaybackFailure(format!("{}: {e}", path.display())))
}

/// Connect to `url` and start pulling its body in the background.
///
/// Resolving, connecting and waiting for the response head are each bounded
/// by `timeout`; so is every wait for the next chunk once playing.
pub(super) fn open_stream(url: &str, timeout: Duration) -> Result<StreamReader> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_resolve(Some(timeout))
        .timeout_connect(Some(timeout))
        .timeout_send_request(Some(timeout))
        .timeout_recv_response(Some(timeout))
        .build()
        .into();

    log::info!("fetch: opening stream {url}");
    let response = agent
        .get(url)
        .call()
        .map_err(|e| Error::PlaybackFailure(format!("{url}: {e}")))?;
    let body = response.into_body().into_reader();
    Ok(StreamReader::spawn(body, timeout, url.to_string()))
}

/// Forward-only reader over a body that another thread is pumping.
///
/// A gap longer than the stall timeout reads as the end of the stream.
pub struct StreamReader {
    chunks: Mutex<Receiver<Vec<u8>>>,
    chunk: Vec<u8>,
    offset: usize,
    position: u64,
    stall: Duration,
}

impl StreamReader {
    pub(super) fn spawn<R>(body: R, stall: Duration, label: String) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(READ_AHEAD);
        thread::spawn(move || pump(body, &tx, &label));
        Self {
            chunks: Mutex::new(rx),
            chunk: Vec::new(),
            offset: 0,
            position: 0,
            stall,
        }
    }
}

fn pump<R: Read>(mut body: R, tx: &SyncSender<Vec<u8>>, label: &str) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match body.read(&mut buf) {
            Ok(0) => {
                log::debug!("fetch: {label} ended");
                break;
            }
            Ok(n) => {
                // The reader is gone once the track is replaced.
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                log::warn!("fetch: {label}: {e}");
                break;
            }
        }
    }
}

impl Read for StreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.offset >= self.chunk.len() {
            let chunks = self
                .chunks
                .get_mut()
                .map_err(|_| io::Error::other("stream reader poisoned"))?;
            match chunks.recv_timeout(self.stall) {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.offset = 0;
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("fetch: stream stalled for {:?}", self.stall);
                    return Ok(0);
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.offset);
        buf[..n].copy_from_slice(&self.chunk[self.offset..self.offset + n]);
        self.offset += n;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for StreamReader {
    /// Only the current position and forward skips are possible.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(_) => None,
        };
        match target {
            Some(t) if t >= self.position => {
                let skip = t - self.position;
                io::copy(&mut self.by_ref().take(skip), &mut io::sink())?;
                Ok(self.position)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "network streams only seek forward",
            )),
        }
    }
}

/// Duration from container metadata, for formats the decoder cannot size.
pub(super) fn probe_duration(data: &[u8]) -> Option<Duration> {
    let tagged = Probe::new(Cursor::new(data))
        .guess_file_type()
        .ok()?
        .read()
        .ok()?;
    let duration = tagged.properties().duration();
    (!duration.is_zero()).then_some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;
    use tempfile::tempdir;

    /// Yields one chunk, then blocks far longer than any test waits.
    struct Stalling {
        sent: bool,
    }

    impl Read for Stalling {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                thread::sleep(Duration::from_secs(30));
                return Ok(0);
            }
            self.sent = true;
            buf[..3].copy_from_slice(b"abc");
            Ok(3)
        }
    }

    #[test]
    fn reads_local_files_fully() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        fs::write(&path, b"abc").unwrap();

        let data = read_file(&path).unwrap();
        assert_eq!(&data[..], b"abc");
    }

    #[test]
    fn missing_files_and_malformed_urls_are_playback_failures() {
        assert!(matches!(
            read_file(Path::new("/definitely/not/here.mp3")),
            Err(Error::PlaybackFailure(_))
        ));
        assert!(matches!(
            open_stream("not a url", Duration::from_secs(1)),
            Err(Error::PlaybackFailure(_))
        ));
    }

    #[test]
    fn silent_server_fails_within_the_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/live", listener.local_addr().unwrap());
        // Accept the connection and never answer.
        thread::spawn(move || {
            let held = listener.accept();
            thread::sleep(Duration::from_secs(10));
            drop(held);
        });

        let started = Instant::now();
        let result = open_stream(&url, Duration::from_millis(300));
        assert!(matches!(result, Err(Error::PlaybackFailure(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stream_reader_delivers_the_body_in_order() {
        let body: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader =
            StreamReader::spawn(Cursor::new(body.clone()), Duration::from_secs(5), "t".into());

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn stalled_stream_reads_as_ended() {
        let mut reader = StreamReader::spawn(
            Stalling { sent: false },
            Duration::from_millis(100),
            "t".into(),
        );
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);

        let started = Instant::now();
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stream_reader_seeks_forward_only() {
        let mut reader = StreamReader::spawn(
            Cursor::new(b"0123456789".to_vec()),
            Duration::from_secs(5),
            "t".into(),
        );
        assert_eq!(reader.seek(SeekFrom::Current(0)).unwrap(), 0);
        assert_eq!(reader.seek(SeekFrom::Start(4)).unwrap(), 4);

        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"45");

        assert!(reader.seek(SeekFrom::Start(0)).is_err());
        assert!(reader.seek(SeekFrom::End(0)).is_err());
    }

    #[test]
    fn probing_garbage_yields_no_duration() {
        assert_eq!(probe_duration(b"definitely not audio"), None);
    }
}
