use anyhow::{Context, Result};

/// Accumulates body chunks and hands out complete, trimmed lines.
///
/// Chunk boundaries from the HTTP body are arbitrary, so a line (or a
/// multi-byte character) may arrive split across several chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Bytes before this offset are known to contain no newline
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line, or `None` until a newline arrives
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let offset = self.pending[self.scanned..].iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=self.scanned + offset).collect();
        self.scanned = 0;
        Some(decode(line))
    }

    /// Flush an unterminated final line once the body has ended
    pub fn finish(&mut self) -> Option<Result<String>> {
        self.scanned = 0;
        if self.pending.is_empty() {
            return None;
        }
        Some(decode(std::mem::take(&mut self.pending)))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    let line = String::from_utf8(bytes).context("SSE line is not valid UTF-8")?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_lines() {
        let mut lines = LineBuffer::new();
        lines.push(b"data: a\r\ndata: b\n");

        assert_eq!(lines.next_line().unwrap().unwrap(), "data: a");
        assert_eq!(lines.next_line().unwrap().unwrap(), "data: b");
        assert!(lines.next_line().is_none());
        assert!(lines.is_empty());
    }

    #[test]
    fn test_split_multibyte_character() {
        let mut lines = LineBuffer::new();
        let text = "data: café\n".as_bytes();
        let split = text.len() - 2;

        lines.push(&text[..split]);
        assert!(lines.next_line().is_none());
        lines.push(&text[split..]);
        assert_eq!(lines.next_line().unwrap().unwrap(), "data: café");
    }

    #[test]
    fn test_finish_flushes_tail() {
        let mut lines = LineBuffer::new();
        lines.push(b"data: last");

        assert_eq!(lines.finish().unwrap().unwrap(), "data: last");
        assert!(lines.finish().is_none());
    }
}
