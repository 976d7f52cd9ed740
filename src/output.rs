//! Incremental JSON array output.

use std::io::Write;

use serde::Serialize;

use crate::error::OutputError;

/// Writes `[elem, elem, ...]` one element at a time.
///
/// Nothing is buffered beyond the element being encoded. If the writer is
/// dropped without [`finish`](Self::finish), the closing bracket is never
/// written and the output is not valid JSON.
pub struct JsonArrayWriter<W: Write> {
    out: W,
    count: usize,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Write the opening bracket.
    pub fn begin(mut out: W) -> Result<Self, OutputError> {
        out.write_all(b"[")?;
        Ok(Self { out, count: 0 })
    }

    pub fn push<T: Serialize + ?Sized>(&mut self, element: &T) -> Result<(), OutputError> {
        if self.count > 0 {
            self.out.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.out, element)?;
        self.count += 1;
        Ok(())
    }

    /// Elements written so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Write the closing bracket, flush, and hand back the writer.
    pub fn finish(mut self) -> Result<W, OutputError> {
        self.out.write_all(b"]")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_compact_array() {
        let mut writer = JsonArrayWriter::begin(Vec::new()).unwrap();
        assert!(writer.is_empty());
        writer.push(&["title", "url"]).unwrap();
        writer.push(&vec![json!("Rust 2024"), json!(null)]).unwrap();
        assert_eq!(writer.len(), 2);
        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"[["title","url"],["Rust 2024",null]]"#
        );
    }

    #[test]
    fn empty_array() {
        let out = JsonArrayWriter::begin(Vec::new()).unwrap().finish().unwrap();
        assert_eq!(out, b"[]");
    }

    #[test]
    fn unfinished_output_is_left_open() {
        let mut buf = Vec::new();
        {
            let mut writer = JsonArrayWriter::begin(&mut buf).unwrap();
            writer.push(&[1, 2]).unwrap();
        }
        assert_eq!(buf, b"[[1,2]");
        assert!(serde_json::from_slice::<serde_json::Value>(&buf).is_err());
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn io_failures_surface() {
        assert!(matches!(
            JsonArrayWriter::begin(Broken),
            Err(OutputError::Io { .. })
        ));
    }
}
