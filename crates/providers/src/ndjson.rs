//! Newline-delimited JSON framing.
//!
//! Network reads split the body at arbitrary byte offsets, including inside
//! a multi-byte UTF-8 sequence, so framing happens on raw bytes and a line
//! is only handed out once its terminating `\n` has arrived.

/// Reassembles complete lines from arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line completed by them, without the
    /// trailing `\n` (or `\r\n`). Blank lines are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = trim_line(&self.pending[start..end]);
            if !line.is_empty() {
                lines.push(line.to_vec());
            }
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Whatever is left once the body has ended, if it is not blank.
    pub fn finish(self) -> Option<Vec<u8>> {
        let line = trim_line(&self.pending);
        (!line.is_empty()).then(|| line.to_vec())
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}
