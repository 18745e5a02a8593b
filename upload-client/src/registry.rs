use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use ingestion_pipeline::StageEvent;
use uuid::Uuid;

use crate::job::{JobStatus, UploadJob};

/// Shared, thread-safe registry of upload jobs.
///
/// Stage events map to progress percentages here; once a job reaches a
/// terminal state any further events for it are ignored, so a late or
/// duplicated stage can never revive a finished job.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, UploadJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new job in the `uploading` state and returns its id.
    pub fn register(&self, filename: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let job = UploadJob::new(id.clone(), filename.to_string());
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), job);
        id
    }

    pub fn get(&self, id: &str) -> Option<UploadJob> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// All jobs, in no particular order.
    pub fn snapshot(&self) -> Vec<UploadJob> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Applies one progress event to a job. Unknown job ids and events after
    /// a terminal state are no-ops.
    pub fn apply(&self, id: &str, event: &StageEvent) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let Some(job) = jobs.get_mut(id) else {
            return;
        };
        if job.status.is_terminal() {
            return;
        }

        match event {
            StageEvent::Start { .. } => {}
            StageEvent::Uploaded { .. } => {
                job.progress = 20;
                job.status = JobStatus::Processing;
            }
            StageEvent::Extracting { .. } => job.progress = 40,
            StageEvent::InsertDocument { .. } => job.progress = 55,
            StageEvent::Splitting { .. } => job.progress = 65,
            StageEvent::Embedding { .. } => job.progress = 80,
            StageEvent::InsertingChunks { .. } => job.progress = 90,
            StageEvent::Done { .. } => {
                job.progress = 100;
                job.status = JobStatus::Done;
            }
            StageEvent::Error { message } => {
                job.status = JobStatus::Error;
                job.error = Some(message.clone());
            }
            StageEvent::Unknown => {}
        }
    }

    /// Marks a job failed with a client-side error message.
    pub fn fail(&self, id: &str, message: impl Into<String>) {
        self.apply(id, &StageEvent::error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_starts_at_zero_uploading() {
        let registry = JobRegistry::new();
        let id = registry.register("report.pdf");

        let job = registry.get(&id).unwrap();
        assert_eq!(job.filename, "report.pdf");
        assert_eq!(job.progress, 0);
        assert_eq!(job.status, JobStatus::Uploading);
        assert!(job.error.is_none());
    }

    #[test]
    fn stage_events_advance_progress() {
        let registry = JobRegistry::new();
        let id = registry.register("a.txt");

        let steps = [
            (
                StageEvent::Uploaded {
                    path: "documents/a.txt".into(),
                },
                20,
            ),
            (
                StageEvent::Extracting {
                    message: String::new(),
                },
                40,
            ),
            (
                StageEvent::InsertDocument {
                    message: String::new(),
                },
                55,
            ),
            (
                StageEvent::Splitting {
                    message: String::new(),
                },
                65,
            ),
            (
                StageEvent::Embedding {
                    message: String::new(),
                },
                80,
            ),
            (
                StageEvent::InsertingChunks {
                    message: String::new(),
                },
                90,
            ),
        ];
        for (event, expected) in steps {
            registry.apply(&id, &event);
            assert_eq!(registry.get(&id).unwrap().progress, expected);
        }

        registry.apply(&id, &StageEvent::Done { id: "doc".into() });
        let job = registry.get(&id).unwrap();
        assert_eq!(job.progress, 100);
        assert_eq!(job.status, JobStatus::Done);
    }

    #[test]
    fn error_event_records_message() {
        let registry = JobRegistry::new();
        let id = registry.register("a.txt");

        registry.apply(&id, &StageEvent::error("No text extracted"));
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("No text extracted"));
    }

    #[test]
    fn terminal_state_is_sticky() {
        let registry = JobRegistry::new();
        let id = registry.register("a.txt");

        registry.apply(&id, &StageEvent::Done { id: "doc".into() });
        registry.apply(&id, &StageEvent::error("late failure"));
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.error.is_none());

        let id = registry.register("b.txt");
        registry.fail(&id, "connection reset");
        registry.apply(
            &id,
            &StageEvent::Uploaded {
                path: "documents/b.txt".into(),
            },
        );
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn unknown_stage_is_a_no_op() {
        let registry = JobRegistry::new();
        let id = registry.register("a.txt");
        registry.apply(
            &id,
            &StageEvent::Uploaded {
                path: "documents/a.txt".into(),
            },
        );

        registry.apply(&id, &StageEvent::Unknown);
        let job = registry.get(&id).unwrap();
        assert_eq!(job.progress, 20);
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn unknown_job_id_is_ignored() {
        let registry = JobRegistry::new();
        registry.apply("missing", &StageEvent::error("whatever"));
        assert!(registry.snapshot().is_empty());
    }
}
