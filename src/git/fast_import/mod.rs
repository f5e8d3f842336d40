// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! `git fast-import` stream writer.
//!
//! ```text
//! commit refs/heads/<branch>
//! author <name> <<email>> <unix-ts> ±HHMM
//! committer <name> <<email>> <unix-ts> ±HHMM
//! data <len>
//! <message>\n                 message already ends in \n, plus optional LF
//! [from <sha> | from refs/heads/<branch>^0]
//! D <path>
//! M <mode> inline <path>
//! data <len>
//! <bytes>\n
//! ```
//!
//! Paths that start with `"` or contain control characters are C-quoted.
//! Content length is taken by seeking the reader, so nothing is buffered
//! beyond one copy into the output.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::git::object::{FileMode, Signature};

/// Parent of the commit being imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromRef {
    /// `from <sha>`: fast-import refuses to move the branch if it no longer
    /// points at an ancestor of the new commit.
    Commit(String),
    /// `from refs/heads/<branch>^0`: continue whatever the branch holds now.
    Branch(String),
}

/// Header of one imported commit.
#[derive(Debug, Clone)]
pub struct CommitHeader<'a> {
    pub branch: &'a str,
    pub author: &'a Signature,
    pub committer: &'a Signature,
    pub message: &'a str,
    /// `None` only for a branch with no history.
    pub from: Option<FromRef>,
}

/// Writes fast-import commands to any [`Write`].
#[derive(Debug)]
pub struct FastImportWriter<W: Write> {
    out: W,
}

impl<W: Write> FastImportWriter<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Emits `commit`, identity lines, the message and the optional `from`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the branch or an identity would break out
    /// of its line, and any error from the underlying writer.
    pub fn commit(&mut self, header: &CommitHeader<'_>) -> io::Result<()> {
        if !is_single_line(header.branch) || header.branch.contains(' ') {
            return Err(invalid_input(format!("branch {:?}", header.branch)));
        }
        for sig in [header.author, header.committer] {
            let framed = |s: &str| is_single_line(s) && !s.contains(['<', '>']);
            if !framed(&sig.name) || !framed(&sig.email) {
                return Err(invalid_input(format!("identity {:?} <{:?}>", sig.name, sig.email)));
            }
        }
        writeln!(self.out, "commit refs/heads/{}", header.branch)?;
        writeln!(self.out, "author {}", header.author)?;
        writeln!(self.out, "committer {}", header.committer)?;
        self.data(header.message.as_bytes())?;
        match &header.from {
            Some(FromRef::Commit(id)) => writeln!(self.out, "from {id}")?,
            Some(FromRef::Branch(branch)) => writeln!(self.out, "from refs/heads/{branch}^0")?,
            None => {}
        }
        Ok(())
    }

    /// Emits `D <path>`.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn delete(&mut self, path: &str) -> io::Result<()> {
        writeln!(self.out, "D {}", quote_path(path))
    }

    /// Emits `M <mode> inline <path>` followed by the content.
    ///
    /// When `size` is `None` the length is found by seeking to the end of
    /// `content`.
    ///
    /// # Errors
    ///
    /// Returns any error from seeking, reading or writing.
    pub fn modify<R>(
        &mut self,
        mode: FileMode,
        path: &str,
        content: &mut R,
        size: Option<u64>,
    ) -> io::Result<()>
    where
        R: Read + Seek + ?Sized,
    {
        let len = match size {
            Some(size) => size,
            None => {
                let end = content.seek(SeekFrom::End(0))?;
                content.seek(SeekFrom::Start(0))?;
                end
            }
        };

        writeln!(self.out, "M {} inline {}", mode.as_octal(), quote_path(path))?;
        writeln!(self.out, "data {len}")?;
        let copied = io::copy(&mut (&mut *content).take(len), &mut self.out)?;
        if copied != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{path}: expected {len} bytes, read {copied}"),
            ));
        }
        self.out.write_all(b"\n")
    }

    /// Emits `M <mode> <id> <path>` for a blob already in the repository.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn modify_existing(&mut self, mode: FileMode, id: &str, path: &str) -> io::Result<()> {
        writeln!(self.out, "M {} {id} {}", mode.as_octal(), quote_path(path))
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns any error from flushing.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn data(&mut self, bytes: &[u8]) -> io::Result<()> {
        writeln!(self.out, "data {}", bytes.len())?;
        self.out.write_all(bytes)?;
        self.out.write_all(b"\n")
    }
}

fn is_single_line(s: &str) -> bool {
    !s.chars().any(char::is_control)
}

fn invalid_input(what: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("refusing to stream {what}"))
}

/// C-quotes a path when fast-import would otherwise misread it.
#[must_use]
pub fn quote_path(path: &str) -> String {
    let needs_quoting = path.starts_with('"') || path.chars().any(char::is_control);
    if !needs_quoting {
        return path.to_string();
    }

    let mut quoted = String::with_capacity(path.len() + 2);
    quoted.push('"');
    for ch in path.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    quoted.push_str(&format!("\\{byte:03o}"));
                }
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Reverses [`quote_path`]; unquoted input is returned as is.
#[must_use]
pub fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return raw.to_string();
    };

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        match next {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'"' => out.push(b'"'),
            b'\\' => out.push(b'\\'),
            b'0'..=b'7' if i + 3 < bytes.len() => {
                let octal = std::str::from_utf8(&bytes[i + 1..i + 4]).unwrap_or("0");
                out.push(u8::from_str_radix(octal, 8).unwrap_or(0));
                i += 4;
                continue;
            }
            other => out.push(other),
        }
        i += 2;
    }
    String::from_utf8_lossy(&out).into_owned()
}
