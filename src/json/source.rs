//! Character sources for the lexer.
//!
//! A [`CharSource`] yields one byte at a time and returns `0` once the input
//! is exhausted. The byte `0` is therefore both NUL and end-of-input; the
//! lexer treats it as end-of-input everywhere.
//!
//! [`PeekBuffer`] sits on top of a source and keeps the current and next
//! byte available for two-character decisions (`//`, `/*`, `*/`).

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::{ErrorCode, SkResult};

/// End-of-input sentinel returned by every source.
pub const EOF_BYTE: u8 = 0;

/// Size of one block read by [`FileSource`].
pub const FILE_BLOCK_SIZE: usize = 1024;

/// Number of bytes held by [`PeekBuffer`].
pub const PEEK_DEPTH: usize = 2;

/// A byte-at-a-time input.
pub trait CharSource {
    /// Next raw byte, or [`EOF_BYTE`] once the input is exhausted.
    fn next_byte(&mut self) -> SkResult<u8>;
}

/// Walks an in-memory buffer. Stops at the end or at the first NUL byte.
#[derive(Debug)]
pub struct StrSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> StrSource<'a> {
    /// Create a source over `text`.
    pub fn new(text: &'a str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// Create a source over raw bytes.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl CharSource for StrSource<'_> {
    fn next_byte(&mut self) -> SkResult<u8> {
        match self.bytes.get(self.pos) {
            Some(&b) if b != EOF_BYTE => {
                self.pos += 1;
                Ok(b)
            }
            _ => Ok(EOF_BYTE),
        }
    }
}

/// Block-buffered file reader.
///
/// Reads [`FILE_BLOCK_SIZE`] bytes at a time and refills transparently when
/// the cursor reaches the end of the block.
#[derive(Debug)]
pub struct FileSource<R = File> {
    reader: R,
    block: Box<[u8; FILE_BLOCK_SIZE]>,
    len: usize,
    pos: usize,
    exhausted: bool,
}

impl FileSource<File> {
    /// Open `path` for reading.
    pub fn open(path: &Path) -> SkResult<Self> {
        if path.is_dir() {
            return Err(ErrorCode::UnsupportedFileSource(path.display().to_string()));
        }
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ErrorCode::FileNotFound(path.display().to_string()),
            _ => ErrorCode::Io(format!("{}: {e}", path.display())),
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> FileSource<R> {
    /// Wrap any reader.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            block: Box::new([0; FILE_BLOCK_SIZE]),
            len: 0,
            pos: 0,
            exhausted: false,
        }
    }

    fn refill(&mut self) -> SkResult<()> {
        loop {
            match self.reader.read(&mut self.block[..]) {
                Ok(0) => {
                    self.exhausted = true;
                    self.len = 0;
                }
                Ok(n) => self.len = n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ErrorCode::Io(e.to_string())),
            }
            self.pos = 0;
            return Ok(());
        }
    }
}

impl<R: Read> CharSource for FileSource<R> {
    fn next_byte(&mut self) -> SkResult<u8> {
        if self.exhausted {
            return Ok(EOF_BYTE);
        }
        if self.pos == self.len {
            self.refill()?;
            if self.exhausted {
                return Ok(EOF_BYTE);
            }
        }
        let b = self.block[self.pos];
        self.pos += 1;
        Ok(b)
    }
}

/// Circular two-byte lookahead over a [`CharSource`].
#[derive(Debug)]
pub struct PeekBuffer<S> {
    source: S,
    ring: [u8; PEEK_DEPTH],
    head: usize,
}

impl<S: CharSource> PeekBuffer<S> {
    /// Wrap `source` and pre-fill both lookahead slots.
    pub fn new(mut source: S) -> SkResult<Self> {
        let first = source.next_byte()?;
        let second = source.next_byte()?;
        Ok(Self {
            source,
            ring: [first, second],
            head: 0,
        })
    }

    /// Byte at lookahead `index`: `0` is current, `1` is the one after.
    ///
    /// Indices beyond the lookahead depth return `None`.
    pub fn peek(&self, index: usize) -> Option<u8> {
        if index >= PEEK_DEPTH {
            return None;
        }
        Some(self.ring[(self.head + index) % PEEK_DEPTH])
    }

    /// Current byte.
    pub fn current(&self) -> u8 {
        self.ring[self.head]
    }

    /// Byte after the current one.
    pub fn following(&self) -> u8 {
        self.ring[(self.head + 1) % PEEK_DEPTH]
    }

    /// Drop the current byte and pull one fresh byte from the source.
    pub fn advance(&mut self) -> SkResult<()> {
        self.ring[self.head] = self.source.next_byte()?;
        self.head = (self.head + 1) % PEEK_DEPTH;
        Ok(())
    }
}
