use crate::config::LoggingConfig;
use crate::error::{FittsError, Result};
use crate::evaluate::{BlockResult, SummaryResult};
use crate::host::LogSink;
use crate::record::{EventRecord, SessionMeta};
use crate::sequence::fmt_value;
use chrono::{Local, Utc};
use csv::WriterBuilder;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

type CsvWriter = csv::Writer<BufWriter<File>>;

const EVENT_HEADER: [&str; 33] = [
    "Timestamp",
    "SubjectID",
    "Condition",
    "Task",
    "Group",
    "FittsTask",
    "SelectionMethod",
    "Repetition",
    "Amplitude",
    "Width",
    "CurrentTargetIndex",
    "TargetName",
    "IndexOfDifficulty",
    "TrialDuration",
    "LastTargetPosX",
    "LastTargetPosY",
    "CurrentTargetPosX",
    "CurrentTargetPosY",
    "MousePosX",
    "MousePosY",
    "Distance",
    "TargetSize",
    "MouseButtonDown",
    "TargetWasHovered",
    "LastTargetWorldX",
    "LastTargetWorldY",
    "LastTargetWorldZ",
    "CurrentTargetWorldX",
    "CurrentTargetWorldY",
    "CurrentTargetWorldZ",
    "MouseWorldPosX",
    "MouseWorldPosY",
    "MouseWorldPosZ",
];

const EVALUATION_HEADER: [&str; 17] = [
    "Timestamp",
    "SubjectID",
    "Condition",
    "Task",
    "Group",
    "FittsTaskType",
    "SelectionMethod",
    "NumberOfRepetitions",
    "NumberOfTrials",
    "IndexOfDifficulty",
    "EffectiveAmplitude",
    "EffectiveWidth",
    "EffectiveIndexOfDifficulty",
    "MeanTimeInSeconds",
    "TotalErrors",
    "ErrorRate",
    "Throughput",
];

const SUMMARY_HEADER: [&str; 15] = [
    "Timestamp",
    "SubjectID",
    "Condition",
    "Task",
    "Group",
    "FittsTask",
    "SelectionMethod",
    "Repetitions",
    "Trials",
    "IDe",
    "MeanTime",
    "ErrorRate",
    "Throughput",
    "RegressionEquation",
    "RegressionFit",
];

/// Writes the event, movement, evaluation and summary logs as flat CSV,
/// one timestamped file per enabled log family. Every row is flushed so an
/// aborted session still leaves usable logs behind.
pub struct CsvLogSink {
    meta: SessionMeta,
    events: Option<CsvWriter>,
    movements: Option<CsvWriter>,
    evaluation: Option<CsvWriter>,
    summary: Option<CsvWriter>,
    paths: Vec<PathBuf>,
}

impl CsvLogSink {
    pub fn create(meta: SessionMeta, logging: &LoggingConfig) -> Result<Self> {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut paths = Vec::new();

        let mut open = |dir: &Path, log_type: &str, header: &[&str]| -> Result<CsvWriter> {
            std::fs::create_dir_all(dir).map_err(|e| FittsError::CreateDir {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let file_path = dir.join(format!("{log_type}_{}_{stamp}.csv", meta.subject_id));
            let file = File::create(&file_path).map_err(|e| FittsError::CreateFile {
                path: file_path.clone(),
                source: e,
            })?;

            let writer = BufWriter::new(file);
            #[allow(unused_mut)]
            let mut builder = WriterBuilder::new();
            #[cfg(windows)]
            {
                use csv::Terminator;
                builder = builder.terminator(Terminator::CRLF);
            }

            let mut wtr = builder.from_writer(writer);
            wtr.write_record(header)?;
            wtr.flush()?;
            paths.push(file_path);
            Ok(wtr)
        };

        let events = if logging.save_events {
            Some(open(&logging.events_dir, "EventLog", &EVENT_HEADER)?)
        } else {
            None
        };
        let movements = if logging.save_movements {
            Some(open(&logging.movements_dir, "MovementLog", &EVENT_HEADER)?)
        } else {
            None
        };
        let evaluation = if logging.save_evaluation {
            Some(open(
                &logging.evaluation_dir,
                "EvaluationLog",
                &EVALUATION_HEADER,
            )?)
        } else {
            None
        };
        let summary = if logging.save_evaluation {
            Some(open(&logging.evaluation_dir, "SummaryLog", &SUMMARY_HEADER)?)
        } else {
            None
        };

        Ok(Self {
            meta,
            events,
            movements,
            evaluation,
            summary,
            paths,
        })
    }

    /// Paths of every log file this sink created.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn event_row(meta: &SessionMeta, record: &EventRecord) -> [String; 33] {
        [
            timestamp(),
            meta.subject_id.to_string(),
            meta.condition.clone(),
            meta.task.clone(),
            meta.group.clone(),
            meta.task_kind.as_str().to_string(),
            meta.selection_method.as_str().to_string(),
            record.repetition.to_string(),
            fmt_value(record.amplitude),
            fmt_value(record.width),
            record.target_index.to_string(),
            record.target_name.clone(),
            record.nominal_id.to_string(),
            fmt_f8(record.trial_duration_s),
            record.last_target.x.to_string(),
            record.last_target.y.to_string(),
            record.current_target.x.to_string(),
            record.current_target.y.to_string(),
            record.mouse.x.to_string(),
            record.mouse.y.to_string(),
            record.distance.to_string(),
            record.target_size.to_string(),
            record.button_down.to_string(),
            record.hovered.to_string(),
            record.last_target_world.x.to_string(),
            record.last_target_world.y.to_string(),
            record.last_target_world.z.to_string(),
            record.current_target_world.x.to_string(),
            record.current_target_world.y.to_string(),
            record.current_target_world.z.to_string(),
            record.mouse_world.x.to_string(),
            record.mouse_world.y.to_string(),
            record.mouse_world.z.to_string(),
        ]
    }

    fn write_row<const N: usize>(writer: &mut CsvWriter, row: [String; N]) -> Result<()> {
        writer.write_record(&row)?;
        writer.flush()?;
        Ok(())
    }
}

impl LogSink for CsvLogSink {
    fn log_event(&mut self, record: &EventRecord) -> Result<()> {
        if let Some(writer) = &mut self.events {
            Self::write_row(writer, Self::event_row(&self.meta, record))?;
        }
        Ok(())
    }

    fn log_movement(&mut self, record: &EventRecord) -> Result<()> {
        if let Some(writer) = &mut self.movements {
            Self::write_row(writer, Self::event_row(&self.meta, record))?;
        }
        Ok(())
    }

    fn log_block(&mut self, result: &BlockResult) -> Result<()> {
        if let Some(writer) = &mut self.evaluation {
            let meta = &self.meta;
            let row = [
                timestamp(),
                meta.subject_id.to_string(),
                meta.condition.clone(),
                meta.task.clone(),
                meta.group.clone(),
                meta.task_kind.as_str().to_string(),
                meta.selection_method.as_str().to_string(),
                meta.repetitions.to_string(),
                meta.trials_per_condition.to_string(),
                result.nominal_id.to_string(),
                fmt_f8(result.effective_amplitude),
                fmt_f8(result.effective_width),
                fmt_f8(result.effective_id),
                fmt_f8(result.mean_time_s),
                result.error_count.to_string(),
                fmt_f8(result.error_rate),
                fmt_f8(result.throughput),
            ];
            Self::write_row(writer, row)?;
        }
        Ok(())
    }

    fn log_summary(&mut self, result: &SummaryResult) -> Result<()> {
        if let Some(writer) = &mut self.summary {
            let meta = &self.meta;
            let row = [
                timestamp(),
                meta.subject_id.to_string(),
                meta.condition.clone(),
                meta.task.clone(),
                meta.group.clone(),
                meta.task_kind.as_str().to_string(),
                meta.selection_method.as_str().to_string(),
                meta.repetitions.to_string(),
                meta.trials_per_condition.to_string(),
                fmt_f8(result.nominal_id),
                fmt_f8(result.mean_time_s),
                fmt_f8(result.mean_error_rate),
                fmt_f8(result.mean_throughput),
                result.regression.equation(),
                fmt_f8(result.regression.r_squared),
            ];
            Self::write_row(writer, row)?;
        }
        Ok(())
    }
}

/// Fixed, locale-independent 8-digit decimal representation; guarantees
/// reproducible diffs across runs.
fn fmt_f8(v: f64) -> String {
    format!("{v:.8}")
}

fn timestamp() -> String {
    Utc::now().timestamp_micros().to_string()
}
