//! Terminal rendering of run reports and pipeline events.
//! Used by both `dubflow run` and `dubflow listen`.

use crate::pipeline::orchestrator::RunReport;
use crate::pipeline::types::{PipelineEvent, PipelineOutcome};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Human-friendly duration: `850ms`, `12.3s`, `4m05s`.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

/// Multi-line summary of a finished run.
pub fn format_report(report: &RunReport, color: bool) -> String {
    let mut out = String::new();

    let (marker, headline) = match &report.outcome {
        PipelineOutcome::Success { output_key } => (
            paint_ok("✓", color),
            format!("{}/{} → {}", report.source_bucket, report.source_key, output_key),
        ),
        PipelineOutcome::Failure { stage, cause } => (
            paint_err("✗", color),
            format!(
                "{}/{} failed in {}: {}",
                report.source_bucket, report.source_key, stage, cause
            ),
        ),
    };
    out.push_str(&format!("{marker} {headline}\n"));
    out.push_str(&format!(
        "  {} {}\n",
        dim("run:", color),
        report.run_id
    ));

    if !report.timings.is_empty() {
        let stages: Vec<String> = report
            .timings
            .iter()
            .map(|t| format!("{} {}", t.stage, format_duration(t.elapsed)))
            .collect();
        out.push_str(&format!("  {} {}\n", dim("stages:", color), stages.join(", ")));
    }
    out.push_str(&format!(
        "  {} {}\n",
        dim("total:", color),
        format_duration(report.total)
    ));
    out
}

/// One line per pipeline event, for verbose progress output.
pub fn format_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::StateEntered { run_id, state } => format!("[{run_id}] → {state}"),
        PipelineEvent::JobPolled {
            run_id,
            job_name,
            attempt,
            status,
        } => format!("[{run_id}] poll #{attempt} {job_name}: {status}"),
        PipelineEvent::StageCompleted {
            run_id,
            stage,
            summary,
        } => format!("[{run_id}] {stage} done ({summary})"),
        PipelineEvent::RunFinished { run_id, outcome } => format!("[{run_id}] {outcome}"),
    }
}

fn paint_ok(text: &str, color: bool) -> String {
    if color {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

fn paint_err(text: &str, color: bool) -> String {
    if color {
        text.red().to_string()
    } else {
        text.to_string()
    }
}

fn dim(text: &str, color: bool) -> String {
    if color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::speech_to_text::JobStatus;
    use crate::pipeline::error::StageError;
    use crate::pipeline::latency::StageTiming;
    use crate::pipeline::types::{PipelineState, Stage};

    fn report(outcome: PipelineOutcome) -> RunReport {
        RunReport {
            run_id: "greeting.mp3-0123456789ab".to_string(),
            source_bucket: "media".to_string(),
            source_key: "greeting.mp3".to_string(),
            outcome,
            states: vec![PipelineState::Init, PipelineState::Done],
            timings: vec![
                StageTiming {
                    stage: Stage::Transcribing,
                    elapsed: Duration::from_secs(20),
                },
                StageTiming {
                    stage: Stage::Translating,
                    elapsed: Duration::from_millis(120),
                },
            ],
            total: Duration::from_millis(20_400),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(12_340)), "12.3s");
        assert_eq!(format_duration(Duration::from_secs(245)), "4m05s");
    }

    #[test]
    fn test_format_success_report() {
        let text = format_report(
            &report(PipelineOutcome::Success {
                output_key: "translations/greeting.mp3_en.mp3".to_string(),
            }),
            false,
        );
        assert!(text.starts_with("✓ media/greeting.mp3 → translations/greeting.mp3_en.mp3\n"));
        assert!(text.contains("run: greeting.mp3-0123456789ab"));
        assert!(text.contains("stages: TRANSCRIBING 20.0s, TRANSLATING 120ms"));
        assert!(text.contains("total: 20.4s"));
    }

    #[test]
    fn test_format_failure_report() {
        let text = format_report(
            &report(PipelineOutcome::Failure {
                stage: Stage::Transcribing,
                cause: StageError::EmptyTranscript,
            }),
            false,
        );
        assert!(text.starts_with("✗ media/greeting.mp3 failed in TRANSCRIBING"));
    }

    #[test]
    fn test_colored_report_has_escape_codes() {
        let text = format_report(
            &report(PipelineOutcome::Success {
                output_key: "k".to_string(),
            }),
            true,
        );
        assert!(text.contains("\x1b["));
    }

    #[test]
    fn test_format_events() {
        assert_eq!(
            format_event(&PipelineEvent::StateEntered {
                run_id: "r".to_string(),
                state: PipelineState::Translating,
            }),
            "[r] → TRANSLATING"
        );
        assert_eq!(
            format_event(&PipelineEvent::JobPolled {
                run_id: "r".to_string(),
                job_name: "r".to_string(),
                attempt: 3,
                status: JobStatus::InProgress,
            }),
            "[r] poll #3 r: IN_PROGRESS"
        );
    }
}
