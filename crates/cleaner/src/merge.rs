use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::clean::recursively_clean;
use crate::config::SelectionConfig;
use crate::patterns::CleaningPatterns;

/// Receives merge progress so the library itself never prints.
pub trait MergeObserver {
    fn file_merged(&mut self, _file_name: &str) {}

    fn file_skipped(&mut self, file_name: &str, error: &serde_json::Error);

    fn finished(&mut self, output_file: &Path);
}

/// Default observer: reports through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl MergeObserver for TracingObserver {
    fn file_merged(&mut self, file_name: &str) {
        info!(file = file_name, "Merged response file");
    }

    fn file_skipped(&mut self, file_name: &str, error: &serde_json::Error) {
        warn!(file = file_name, error = %error, "Skipping {}: Invalid JSON", file_name);
    }

    fn finished(&mut self, output_file: &Path) {
        info!("Cleaned JSON contents written to: {}", output_file.display());
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub merged: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct ResponseMerger {
    patterns: CleaningPatterns,
    selection: SelectionConfig,
}

impl ResponseMerger {
    pub fn new(patterns: CleaningPatterns, selection: SelectionConfig) -> Self {
        Self { patterns, selection }
    }

    /// Clean every matching response file in `folder` and concatenate the
    /// pretty-printed results into `output_file`, which is truncated first.
    ///
    /// Files that are not valid JSON are reported and skipped; any I/O
    /// failure aborts the merge.
    pub async fn merge_json_to_txt(
        &self,
        folder: &Path,
        output_file: &Path,
        observer: &mut dyn MergeObserver,
    ) -> Result<MergeReport> {
        let mut out = fs::File::create(output_file)
            .await
            .context(format!("Failed to create output file: {:?}", output_file))?;

        let mut report = MergeReport::default();

        for (file_name, path) in self.list_candidates(folder, output_file).await? {
            let bytes = fs::read(&path)
                .await
                .context(format!("Failed to read file: {:?}", path))?;

            let data: serde_json::Value = match serde_json::from_slice(&bytes) {
                Ok(data) => data,
                Err(e) => {
                    observer.file_skipped(&file_name, &e);
                    report.skipped.push(file_name);
                    continue;
                }
            };

            let cleaned = recursively_clean(&data, &self.patterns);
            let mut rendered = serde_json::to_string_pretty(&cleaned)?;
            rendered.push_str("\n\n");

            out.write_all(rendered.as_bytes())
                .await
                .context(format!("Failed to write to {:?}", output_file))?;

            observer.file_merged(&file_name);
            report.merged.push(file_name);
        }

        out.flush().await?;
        observer.finished(output_file);

        Ok(report)
    }

    /// Matching regular files in `folder`, sorted by name.
    async fn list_candidates(&self, folder: &Path, output_file: &Path) -> Result<Vec<(String, PathBuf)>> {
        let mut candidates = Vec::new();

        let mut entries = fs::read_dir(folder)
            .await
            .context(format!("Failed to list directory: {:?}", folder))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            let raw_name = entry.file_name();
            let file_name = raw_name.to_string_lossy().into_owned();
            if raw_name.to_str().is_none() {
                debug!(file = %file_name, "File name is not valid UTF-8, matching on lossy form");
            }
            if !self.selection.matches(&file_name) {
                continue;
            }
            // follows symlinks, so linked response files are merged too
            let metadata = fs::metadata(&path)
                .await
                .context(format!("Failed to stat file: {:?}", path))?;
            if !metadata.is_file() {
                continue;
            }
            if is_same_file(&path, output_file).await {
                continue;
            }

            candidates.push((file_name, path));
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(candidates)
    }
}

async fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a).await, fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Merge with the default pattern list and file selection.
pub async fn merge_json_to_txt(folder: &Path, output_file: &Path) -> Result<MergeReport> {
    ResponseMerger::new(CleaningPatterns::default(), SelectionConfig::default())
        .merge_json_to_txt(folder, output_file, &mut TracingObserver)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        merged: Vec<String>,
        skipped: Vec<String>,
        finished: Vec<PathBuf>,
    }

    impl MergeObserver for RecordingObserver {
        fn file_merged(&mut self, file_name: &str) {
            self.merged.push(file_name.to_string());
        }

        fn file_skipped(&mut self, file_name: &str, _error: &serde_json::Error) {
            self.skipped.push(file_name.to_string());
        }

        fn finished(&mut self, output_file: &Path) {
            self.finished.push(output_file.to_path_buf());
        }
    }

    fn merger() -> ResponseMerger {
        ResponseMerger::new(CleaningPatterns::default(), SelectionConfig::default())
    }

    #[tokio::test]
    async fn test_merges_only_valid_response_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a_responses.json"),
            r#"{"prompt_1": {"prompt": "Hi", "response": "**Hello**\\nthere"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b_responses.json"), r#"{"prompt_1": {"prom"#).unwrap();
        std::fs::write(dir.path().join("c_other.json"), r#"{"x": "**y**"}"#).unwrap();
        let output = dir.path().join("merged.txt");

        let mut observer = RecordingObserver::default();
        let report = merger()
            .merge_json_to_txt(dir.path(), &output, &mut observer)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let expected = "{\n  \"prompt_1\": {\n    \"prompt\": \"Hi\",\n    \"response\": \"Hellothere\"\n  }\n}\n\n";
        assert_eq!(written, expected);

        assert_eq!(report.merged, vec!["a_responses.json"]);
        assert_eq!(report.skipped, vec!["b_responses.json"]);
        assert_eq!(observer.skipped, vec!["b_responses.json"]);
        assert_eq!(observer.merged, vec!["a_responses.json"]);
        assert_eq!(observer.finished, vec![output]);
    }

    #[tokio::test]
    async fn test_default_merge_uses_default_selection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run_responses.json"), r#"{"a": "x\\u2013y"}"#).unwrap();
        std::fs::write(dir.path().join("notes.json"), r#"{"a": "skip me"}"#).unwrap();
        let output = dir.path().join("merged_response_output.txt");

        let report = merge_json_to_txt(dir.path(), &output).await.unwrap();

        assert_eq!(report.merged, vec!["run_responses.json"]);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "{\n  \"a\": \"xy\"\n}\n\n"
        );
    }

    #[tokio::test]
    async fn test_files_are_merged_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("z_responses.json"), r#""last""#).unwrap();
        std::fs::write(dir.path().join("m_responses.json"), r#""middle""#).unwrap();
        std::fs::write(dir.path().join("a_responses.json"), r#""first""#).unwrap();
        let output = dir.path().join("merged.txt");

        let report = merger()
            .merge_json_to_txt(dir.path(), &output, &mut RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(
            report.merged,
            vec!["a_responses.json", "m_responses.json", "z_responses.json"]
        );
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, "\"first\"\n\n\"middle\"\n\n\"last\"\n\n");
    }

    #[tokio::test]
    async fn test_existing_output_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.txt");
        std::fs::write(&output, "stale contents").unwrap();

        let report = merger()
            .merge_json_to_txt(dir.path(), &output, &mut RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(report, MergeReport::default());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }

    #[tokio::test]
    async fn test_non_ascii_is_written_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x_responses.json"), r#"{"r": "café – ok"}"#).unwrap();
        let output = dir.path().join("merged.txt");

        merger()
            .merge_json_to_txt(dir.path(), &output, &mut RecordingObserver::default())
            .await
            .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, "{\n  \"r\": \"café – ok\"\n}\n\n");
    }

    #[tokio::test]
    async fn test_output_inside_folder_is_not_read_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_responses.json"), r#"[1, 2]"#).unwrap();
        let output = dir.path().join("merged_responses.json");

        let report = merger()
            .merge_json_to_txt(dir.path(), &output, &mut RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(report.merged, vec!["a_responses.json"]);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_directories_matching_the_filter_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("old_responses.json")).unwrap();
        let output = dir.path().join("merged.txt");

        let report = merger()
            .merge_json_to_txt(dir.path(), &output, &mut RecordingObserver::default())
            .await
            .unwrap();

        assert!(report.merged.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_response_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.json"), r#"{"a": "**x**"}"#).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("real.json"),
            dir.path().join("a_responses.json"),
        )
        .unwrap();
        let output = dir.path().join("merged.txt");

        let report = merger()
            .merge_json_to_txt(dir.path(), &output, &mut RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(report.merged, vec!["a_responses.json"]);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "{\n  \"a\": \"x\"\n}\n\n");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_file_name_is_still_merged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let name = OsStr::from_bytes(b"run\xff_responses.json");
        std::fs::write(dir.path().join(name), "[\"ok\"]").unwrap();
        let output = dir.path().join("merged.txt");

        let report = merger()
            .merge_json_to_txt(dir.path(), &output, &mut RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(report.merged, vec!["run\u{FFFD}_responses.json"]);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "[\n  \"ok\"\n]\n\n");
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.txt");

        let err = merger()
            .merge_json_to_txt(&dir.path().join("nope"), &output, &mut RecordingObserver::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to list directory"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_counts_as_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad_responses.json"), [b'"', 0xff, b'"']).unwrap();
        let output = dir.path().join("merged.txt");

        let report = merger()
            .merge_json_to_txt(dir.path(), &output, &mut RecordingObserver::default())
            .await
            .unwrap();

        assert_eq!(report.skipped, vec!["bad_responses.json"]);
    }
}
