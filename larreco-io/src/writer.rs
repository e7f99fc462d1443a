//! Result sinks for reconstructed events.

use crate::{Error, Result};
use larreco_core::ReconstructedEvent;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Consumer of reconstructed events.
pub trait ResultSink {
    /// Records one event and its tracks.
    ///
    /// # Errors
    /// Returns an error if the event cannot be written.
    fn write_event(&mut self, event: &ReconstructedEvent) -> Result<()>;

    /// Flushes buffered output.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    fn flush(&mut self) -> Result<()>;
}

impl ResultSink for Vec<ReconstructedEvent> {
    fn write_event(&mut self, event: &ReconstructedEvent) -> Result<()> {
        self.push(event.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Output encodings supported by [`DataFileWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One CSV row per track; events without tracks get one row with the
    /// track columns left empty.
    #[default]
    Csv,
    /// One JSON object per event.
    JsonLines,
}

impl OutputFormat {
    /// Picks the format from a file extension (`.jsonl`/`.json` or `.csv`).
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for other extensions.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("jsonl" | "json") => Ok(Self::JsonLines),
            _ => Err(Error::InvalidFormat(format!(
                "cannot infer output format of {}",
                path.as_ref().display()
            ))),
        }
    }
}

const CSV_HEADER: &str =
    "event,ts_start,ts_end,event_hits,orphans,track,theta,phi,xp,yp,track_hits";

/// Writer for reconstruction output files.
pub struct DataFileWriter<W: Write = BufWriter<File>> {
    writer: W,
    format: OutputFormat,
    header_written: bool,
}

impl DataFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), format))
    }
}

impl<W: Write> DataFileWriter<W> {
    /// Wraps an existing writer.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            header_written: false,
        }
    }

    /// Returns the output format.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Flushes and returns the inner writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_csv(&mut self, reco: &ReconstructedEvent) -> Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{CSV_HEADER}")?;
            self.header_written = true;
        }

        let event = &reco.event;
        let prefix = format!(
            "{},{},{},{},{}",
            event.id(),
            event.collection().ts_start().as_u64(),
            event.collection().ts_end().as_u64(),
            event.len(),
            reco.orphans.len()
        );

        if reco.tracks.is_empty() {
            writeln!(self.writer, "{prefix},,,,,,")?;
        }
        for (index, track) in reco.tracks.iter().enumerate() {
            let [theta, phi, xp, yp] = track.line.params();
            writeln!(
                self.writer,
                "{prefix},{index},{theta},{phi},{xp},{yp},{}",
                track.len()
            )?;
        }
        Ok(())
    }
}

impl<W: Write> ResultSink for DataFileWriter<W> {
    fn write_event(&mut self, event: &ReconstructedEvent) -> Result<()> {
        match self.format {
            OutputFormat::Csv => self.write_csv(event),
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, event)?;
                writeln!(self.writer)?;
                Ok(())
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larreco_core::{Event, Hit, Line, Point3, Track};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn sample() -> ReconstructedEvent {
        let hits = (0..4)
            .map(|k| Hit::new(k, 1.0, 2.0, 100 + k as u64, 1.0))
            .collect();
        let event = Arc::new(Event::new(3, hits));
        let line = Line::from_dir_point(0.5, 1.0, &Point3::origin()).unwrap();
        ReconstructedEvent::new(event, vec![Track::new(line, vec![0, 1, 2])])
    }

    #[test]
    fn test_write_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DataFileWriter::create(file.path(), OutputFormat::Csv).unwrap();

        writer.write_event(&sample()).unwrap();
        let lone = Event::new(4, vec![Hit::new(9, 0.0, 0.0, 500, 2.0)]);
        let empty = ReconstructedEvent::new(Arc::new(lone), Vec::new());
        writer.write_event(&empty).unwrap();
        writer.flush().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("3,100,103,4,1,0,"));
        assert!(lines[1].ends_with(",3"));
        assert_eq!(lines[2], "4,500,500,1,1,,,,,,");
    }

    #[test]
    fn test_write_json_lines() {
        let mut writer = DataFileWriter::new(Vec::new(), OutputFormat::JsonLines);
        writer.write_event(&sample()).unwrap();
        writer.write_event(&sample()).unwrap();
        let bytes = writer.into_inner().unwrap();

        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["orphans"], serde_json::json!([3]));
        assert_eq!(value["tracks"][0]["hit_indices"], serde_json::json!([0, 1, 2]));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path("out.csv").unwrap(), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_path("out.JSONL").unwrap(),
            OutputFormat::JsonLines
        );
        assert!(OutputFormat::from_path("out.bin").is_err());
    }
}
