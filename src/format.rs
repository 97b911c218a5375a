use serde::Serialize;

use crate::monitor::{FileStatus, MonitorState};

#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    directory: Option<String>,
    files: Vec<FileReport>,
    emotions: &'a [String],
    songs: &'a [String],
    error: Option<&'a str>,
}

fn status_label(status: &FileStatus) -> &'static str {
    match status {
        FileStatus::Pending => "pending",
        FileStatus::Uploading => "uploading",
        FileStatus::Done => "done",
        FileStatus::Failed(_) => "failed",
    }
}

/// Format the monitor state as a plain-text report.
pub fn format_report(state: &MonitorState) -> String {
    let separator = "\u{2500}".repeat(58);
    let mut output = String::new();

    if let Some(dir) = state.directory() {
        output.push_str(&format!("Directory: {}\n", dir.path().display()));
    }
    output.push_str(&format!("{:<10} {}\n", "Status", "File"));
    output.push_str(&separator);
    output.push('\n');
    for (file, status) in state.files() {
        output.push_str(&format!("{:<10} {}\n", status_label(status), file.filename()));
    }
    output.push_str(&separator);
    output.push('\n');

    output.push_str(&format!(
        "Files processed: {}/{} ({} failed)\n",
        state.processed_count(),
        state.files().len(),
        state.failed_count(),
    ));

    if let Some(error) = state.error() {
        output.push_str(&format!("Error: {}\n", error));
    }

    output.push_str("\nDetected Emotions\n");
    if state.emotions().is_empty() {
        output.push_str("  No emotions detected yet.\n");
    } else {
        for emotion in state.emotions() {
            output.push_str(&format!("  {}\n", emotion));
        }
    }

    if !state.songs().is_empty() {
        output.push_str("\nRecommended Songs\n");
        for (i, song) in state.songs().iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, song));
        }
    }

    output.trim_end().to_string()
}

/// Format the monitor state as pretty-printed JSON.
pub fn format_json(state: &MonitorState) -> String {
    let report = Report {
        directory: state.directory().map(|d| d.path().display().to_string()),
        files: state
            .files()
            .iter()
            .map(|(file, status)| FileReport {
                path: file.path.display().to_string(),
                status: status_label(status),
                error: match status {
                    FileStatus::Failed(msg) => Some(msg.clone()),
                    _ => None,
                },
            })
            .collect(),
        emotions: state.emotions(),
        songs: state.songs(),
        error: state.error(),
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InferenceResult, MonitorEvent};

    fn settled_state() -> MonitorState {
        let (mut state, generation) = MonitorState::discovered("/ecg", &["a.csv", "c.csv"]);
        state.apply(MonitorEvent::FileCompleted {
            generation,
            index: 0,
            result: InferenceResult {
                emotions: vec!["calm".to_string(), "happy".to_string()],
                songs: vec!["http://x/1".to_string()],
            },
        });
        state.apply(MonitorEvent::FileFailed {
            generation,
            index: 1,
            message: "Error processing file /ecg/c.csv: boom".to_string(),
        });
        state
    }

    #[test]
    fn test_format_report_sections() {
        let report = format_report(&settled_state());
        assert!(report.contains("Directory: /ecg"));
        assert!(report.contains("done       a.csv"));
        assert!(report.contains("failed     c.csv"));
        assert!(report.contains("Files processed: 2/2 (1 failed)"));
        assert!(report.contains("Error: Error processing file /ecg/c.csv: boom"));
        assert!(report.contains("Detected Emotions\n  calm\n  happy"));
        assert!(report.contains("Recommended Songs\n  1. http://x/1"));
    }

    #[test]
    fn test_format_report_empty() {
        let report = format_report(&MonitorState::new());
        assert!(report.contains("No emotions detected yet."));
        assert!(!report.contains("Recommended Songs"));
        assert!(!report.contains("Error:"));
    }

    #[test]
    fn test_format_json_fields() {
        let json = format_json(&settled_state());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["emotions"], serde_json::json!(["calm", "happy"]));
        assert_eq!(value["songs"], serde_json::json!(["http://x/1"]));
        assert_eq!(value["files"][0]["status"], "done");
        assert!(value["files"][0].get("error").is_none());
        assert_eq!(value["files"][1]["status"], "failed");
        assert_eq!(value["directory"], "/ecg");
        assert!(format_json(&MonitorState::new()).contains("\"directory\": null"));
    }
}
