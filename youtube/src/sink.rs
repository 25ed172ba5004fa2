//! Writing the export.

use crate::enrich::{AnalyticsRow, ExportSet};
use eyre::Context;
use std::path::PathBuf;

/// File name of the export inside the output directory.
pub const EXPORT_FILE_NAME: &str = "youtube_data.csv";

/// Destination for the finished export.
pub trait RecordSink {
    fn write(&mut self, export: &ExportSet) -> eyre::Result<()>;
}

/// Writes the export as a CSV table with a header row, replacing any earlier export.
#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir.join(EXPORT_FILE_NAME)
    }
}

impl RecordSink for CsvSink {
    fn write(&mut self, export: &ExportSet) -> eyre::Result<()> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("create output directory {}", self.output_dir.display())
        })?;
        let path = self.path();

        // the header is written by hand so an empty export still gets one
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(&path)
            .with_context(|| format!("create {}", path.display()))?;
        writer
            .write_record(AnalyticsRow::COLUMNS)
            .context("write header row")?;
        for row in export.rows() {
            writer
                .serialize(row)
                .with_context(|| format!("write row for video {}", row.video_id))?;
        }
        writer
            .flush()
            .with_context(|| format!("flush {}", path.display()))?;

        tracing::info!(rows = export.len(), path = %path.display(), "saved export");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(video_id: &str, title: &str, source: &str, likes: Option<&str>) -> AnalyticsRow {
        AnalyticsRow {
            video_id: video_id.to_string(),
            title: title.to_string(),
            day: "2024-03-01".to_string(),
            traffic_source_category: source.to_string(),
            view_count: serde_json::Number::from(14),
            average_view_duration: serde_json::Number::from(41),
            like_count: likes.map(str::to_string),
            comment_count: Some("0".to_string()),
        }
    }

    #[test]
    fn writes_header_and_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("out"));
        let export: ExportSet = [
            row("abc", "Intro, part 1", "YT_SEARCH", Some("12")),
            row("def", "Hidden likes", "EXT_URL", None),
        ]
        .into_iter()
        .collect();

        sink.write(&export).unwrap();

        let written = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert!(written.ends_with(",,0\n"));
        insta::assert_snapshot!(written, @r#"
        video_id,title,day,insightTrafficSourceType,view_count,average_view_duration,like_count,comment_count
        abc,"Intro, part 1",2024-03-01,YT_SEARCH,14,41,12,0
        def,Hidden likes,2024-03-01,EXT_URL,14,41,,0
        "#);
    }

    #[test]
    fn empty_export_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());

        sink.write(&ExportSet::default()).unwrap();

        let written = std::fs::read_to_string(dir.path().join(EXPORT_FILE_NAME)).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.starts_with("video_id,title,"));
    }

    #[test]
    fn replaces_previous_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());
        let first: ExportSet = [row("a", "A", "YT_SEARCH", None), row("b", "B", "YT_SEARCH", None)]
            .into_iter()
            .collect();
        let second: ExportSet = [row("c", "C", "YT_SEARCH", None)].into_iter().collect();

        sink.write(&first).unwrap();
        sink.write(&second).unwrap();

        let written = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.contains("\nc,C,"));
    }
}
