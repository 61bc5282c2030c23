//! Batch writer: the delete/add envelope around the shared sink
//!
//! Lifecycle for one run:
//! 1. [`BatchWriter::begin`] writes the optional delete section and opens
//!    the add section, before any consumer starts.
//! 2. Consumers call [`BatchWriter::append`] concurrently. Each call takes
//!    the sink lock once and writes one whole rendered fragment, so
//!    documents never interleave.
//! 3. [`BatchWriter::finish`] closes the add section, flushes, and hands the
//!    sink back, after every consumer has joined.
//!
//! A failed write may leave part of a fragment in the sink. The writer is
//! then poisoned: later appends are refused and `finish` returns an error,
//! so a torn artifact is never closed as a valid batch.

use crate::output::document::{escape_xml, DocumentFragment};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

/// Buffer size for file-backed sinks
pub const FILE_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Closing tag of the add section
pub const ADD_CLOSE: &str = "</add>\n";

/// Sink plus the poison flag, guarded by one lock
struct SinkState<W> {
    sink: W,
    poisoned: bool,
}

/// Writes one batch artifact to a shared sink
pub struct BatchWriter<W: Write + Send> {
    state: Mutex<SinkState<W>>,
    documents: AtomicU64,
    bytes: AtomicU64,
}

fn poisoned_error() -> io::Error {
    io::Error::other("batch sink poisoned by an earlier failed write")
}

impl<W: Write + Send> BatchWriter<W> {
    /// Write the delete section (if any ids) and open the add section
    pub fn begin(mut sink: W, delete_ids: &[String]) -> io::Result<Self> {
        let mut header = String::new();
        if !delete_ids.is_empty() {
            header.push_str("<delete>");
            for id in delete_ids {
                header.push_str("<id>");
                header.push_str(&escape_xml(id));
                header.push_str("</id>");
            }
            header.push_str("</delete>\n");
        }
        header.push_str("<add>\n");
        sink.write_all(header.as_bytes())?;

        Ok(Self {
            state: Mutex::new(SinkState {
                sink,
                poisoned: false,
            }),
            documents: AtomicU64::new(0),
            bytes: AtomicU64::new(header.len() as u64),
        })
    }

    /// Append one document as a single locked write
    pub fn append(&self, fragment: &DocumentFragment) -> io::Result<()> {
        let text = fragment.render();
        {
            let mut state = self.state.lock();
            if state.poisoned {
                return Err(poisoned_error());
            }
            if let Err(e) = state.sink.write_all(text.as_bytes()) {
                state.poisoned = true;
                return Err(e);
            }
        }
        self.documents.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(text.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Documents appended so far
    pub fn documents(&self) -> u64 {
        self.documents.load(Ordering::Relaxed)
    }

    /// Bytes written so far, including the envelope
    pub fn bytes_written(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Whether a failed write has poisoned the sink
    pub fn is_poisoned(&self) -> bool {
        self.state.lock().poisoned
    }

    /// Close the add section, flush, and return the sink
    pub fn finish(self) -> io::Result<W> {
        let state = self.state.into_inner();
        if state.poisoned {
            return Err(poisoned_error());
        }
        let mut sink = state.sink;
        sink.write_all(ADD_CLOSE.as_bytes())?;
        sink.flush()?;
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_add_only_batch() {
        let writer = BatchWriter::begin(Vec::new(), &[]).unwrap();
        writer.append(&DocumentFragment::new("a", "a")).unwrap();
        assert_eq!(writer.documents(), 1);

        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "<add>\n<doc><field name=\"id\">a</field><field name=\"title\">a</field></doc>\n</add>\n"
        );
    }

    #[test]
    fn test_delete_section_precedes_add() {
        let ids = vec!["A".to_string(), "B".to_string()];
        let writer = BatchWriter::begin(Vec::new(), &ids).unwrap();
        writer.append(&DocumentFragment::new("C", "C")).unwrap();

        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(out.starts_with("<delete><id>A</id><id>B</id></delete>\n<add>\n"));
        assert!(out.ends_with("</add>\n"));
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let writer = Arc::new(BatchWriter::begin(Vec::new(), &[]).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    for i in 0..50 {
                        let mut doc = DocumentFragment::new(&format!("{}-{}", t, i), "x");
                        doc.push("payload", "y".repeat(500 + i));
                        writer.append(&doc).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let writer = Arc::try_unwrap(writer).ok().unwrap();
        assert_eq!(writer.documents(), 400);
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();

        let body: Vec<&str> = out.lines().collect();
        assert_eq!(body.first(), Some(&"<add>"));
        assert_eq!(body.last(), Some(&"</add>"));
        for line in &body[1..body.len() - 1] {
            assert!(line.starts_with("<doc>") && line.ends_with("</doc>"));
            assert_eq!(line.matches("<doc>").count(), 1);
        }
        assert_eq!(body.len(), 402);
    }

    /// Accepts `budget` bytes, then writes a short prefix and fails
    struct FailingSink {
        out: Vec<u8>,
        budget: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::other("disk full"));
            }
            let n = buf.len().min(self.budget);
            self.out.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_poisons_writer() {
        let sink = FailingSink {
            out: Vec::new(),
            budget: 30,
        };
        let writer = BatchWriter::begin(sink, &[]).unwrap();

        let first = DocumentFragment::new("first-document-with-a-long-id", "x");
        assert!(writer.append(&first).is_err());
        assert!(writer.is_poisoned());

        // nothing may land after the torn prefix
        let second = DocumentFragment::new("second", "y");
        assert!(writer.append(&second).is_err());
        assert_eq!(writer.documents(), 0);

        let state = &writer.state.lock();
        let written = String::from_utf8_lossy(&state.sink.out).into_owned();
        assert!(!written.contains("second"));
        assert_eq!(written.len(), 30);
    }

    #[test]
    fn test_finish_rejects_poisoned_batch() {
        let sink = FailingSink {
            out: Vec::new(),
            budget: 10,
        };
        let writer = BatchWriter::begin(sink, &[]).unwrap();
        assert!(writer.append(&DocumentFragment::new("a", "a")).is_err());
        assert!(writer.finish().is_err());
    }
}
