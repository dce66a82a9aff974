use std::io::Write;

use tracing::warn;

/// A candidate whose digest is in the hash list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub digest: Vec<u8>,
    pub candidate: Vec<u8>,
}

/// True if `bytes` would not survive as one printable line.
pub fn needs_hex(bytes: &[u8]) -> bool {
    bytes.iter().any(|b| !(0x20..=0x7E).contains(b))
}

/// Formats `bytes` as `$HEX[...]`.
pub fn hexlify(bytes: &[u8]) -> String {
    format!("$HEX[{}]", hex::encode(bytes))
}

/// Writes matches as `<hex digest><separator><candidate>` lines.
///
/// Only the coordinating thread owns a sink. Write errors are logged and the
/// run carries on.
pub struct ResultSink<W: Write> {
    out: W,
    separator: Vec<u8>,
    autohex: bool,
    line: Vec<u8>,
    written: u64,
}

impl<W: Write> ResultSink<W> {
    pub fn new(out: W, separator: &str, autohex: bool) -> Self {
        Self {
            out,
            separator: separator.as_bytes().to_vec(),
            autohex,
            line: Vec::with_capacity(256),
            written: 0,
        }
    }

    pub fn write(&mut self, m: &Match) {
        self.line.clear();
        self.line.extend_from_slice(hex::encode(&m.digest).as_bytes());
        self.line.extend_from_slice(&self.separator);
        if self.autohex && needs_hex(&m.candidate) {
            self.line.extend_from_slice(hexlify(&m.candidate).as_bytes());
        } else {
            self.line.extend_from_slice(&m.candidate);
        }
        self.line.push(b'\n');

        match self.out.write_all(&self.line) {
            Ok(()) => self.written += 1,
            Err(e) => warn!(error = %e, "failed to write cracked hash"),
        }
    }

    /// Lines successfully written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!(error = %e, "failed to flush output");
        }
    }

    /// Flushes and returns the writer.
    pub fn into_inner(mut self) -> W {
        self.flush();
        self.out
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    fn password_match() -> Match {
        Match {
            digest: hex!("5f4dcc3b5aa765d61d8327deb882cf99").to_vec(),
            candidate: b"password".to_vec(),
        }
    }

    #[test]
    fn test_default_format() {
        let mut sink = ResultSink::new(Vec::new(), ":", true);
        sink.write(&password_match());
        assert_eq!(sink.written(), 1);
        assert_eq!(sink.into_inner(), b"5f4dcc3b5aa765d61d8327deb882cf99:password\n");
    }

    #[test]
    fn test_custom_separator() {
        let mut sink = ResultSink::new(Vec::new(), "\t|\t", true);
        sink.write(&password_match());
        assert_eq!(sink.into_inner(), b"5f4dcc3b5aa765d61d8327deb882cf99\t|\tpassword\n");
    }

    #[test]
    fn test_autohex() {
        let m = Match { digest: vec![0x01, 0x02], candidate: vec![b'p', 0xE9, b'\t'] };

        let mut sink = ResultSink::new(Vec::new(), ":", true);
        sink.write(&m);
        assert_eq!(sink.into_inner(), b"0102:$HEX[70e909]\n");

        let mut sink = ResultSink::new(Vec::new(), ":", false);
        sink.write(&m);
        assert_eq!(sink.into_inner(), b"0102:p\xe9\t\n");
    }

    #[test]
    fn test_needs_hex() {
        assert!(!needs_hex(b"plain ascii ~!"));
        assert!(!needs_hex(b""));
        assert!(needs_hex(b"tab\there"));
        assert!(needs_hex(&[0x7F]));
        assert!(needs_hex("caf\u{e9}".as_bytes()));
        assert_eq!(hexlify(b"ab"), "$HEX[6162]");
    }

    #[test]
    fn test_write_errors_are_not_fatal() {
        let mut sink = ResultSink::new(FailingWriter, ":", true);
        sink.write(&password_match());
        sink.flush();
        assert_eq!(sink.written(), 0);
    }
}
