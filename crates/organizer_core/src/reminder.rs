//! crates/organizer_core/src/reminder.rs
//!
//! The deadline-reminder pipeline: scan for assignments due tomorrow,
//! filter out ones created too close to their own deadline, attempt one
//! email per candidate, and durably mark successful sends so an
//! assignment is never reminded twice.
//!
//! The pipeline is pure orchestration over the `DatabaseService` and
//! `MailService` ports; it holds no state of its own, so concurrent runs
//! (a manual trigger racing the daily one) are safe, merely wasteful.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::domain::ReminderCandidate;
use crate::ports::{DatabaseService, MailService};

//=========================================================================================
// Scan Window
//=========================================================================================

/// A half-open UTC time interval `[start, end)` selecting deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScanWindow {
    /// The calendar day one day after `now`'s UTC date, midnight to
    /// midnight. Computed from day boundaries rather than `now + 24h`
    /// so "due tomorrow" means the same thing no matter what time of
    /// day the scan runs.
    pub fn due_tomorrow(now: DateTime<Utc>) -> Self {
        let tomorrow = now.date_naive() + Duration::days(1);
        let start = tomorrow
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc();
        Self {
            start,
            end: start + Duration::hours(24),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

//=========================================================================================
// Eligibility
//=========================================================================================

/// An assignment created less than a day before its own deadline offers
/// no advance warning, so we skip it rather than send a reminder that
/// arrives essentially at creation time. Policy, not a technical limit.
pub fn is_eligible(candidate: &ReminderCandidate) -> bool {
    candidate.deadline - candidate.created_at >= Duration::hours(24)
}

//=========================================================================================
// Run Summary
//=========================================================================================

/// Counts from one complete scan-filter-notify-mark run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// The scan query itself failed; nothing was processed.
    pub scan_failed: bool,
    /// Candidates returned by the scan.
    pub scanned: usize,
    /// Candidates that passed the eligibility filter.
    pub eligible: usize,
    /// Reminders handed to the mail transport.
    pub sent: usize,
    /// Delivery attempts the transport rejected or that errored.
    pub send_failed: usize,
    /// Sends that succeeded but whose durable mark failed. The email is
    /// out and the flag is not set, so the next run may send it again.
    pub mark_failed: usize,
}

//=========================================================================================
// Pipeline
//=========================================================================================

/// Owns the reminder control flow. Built once at startup with injected
/// persistence and mail ports, then shared by the daily scheduler and
/// the manual-trigger endpoint.
pub struct ReminderPipeline {
    db: Arc<dyn DatabaseService>,
    mail: Arc<dyn MailService>,
}

impl ReminderPipeline {
    pub fn new(db: Arc<dyn DatabaseService>, mail: Arc<dyn MailService>) -> Self {
        Self { db, mail }
    }

    /// One complete run: scan -> (per candidate) filter -> notify -> mark.
    ///
    /// A scan failure aborts the run. Per-candidate failures are logged
    /// and skipped; one candidate's bad luck never affects the others.
    /// The send happens strictly before the mark: crashing between the
    /// two risks a duplicate email next run, while the reverse order
    /// would silently lose reminders.
    pub async fn run(&self, now: DateTime<Utc>) -> RunSummary {
        let mut summary = RunSummary::default();
        let window = ScanWindow::due_tomorrow(now);

        info!(start = %window.start, end = %window.end, "checking for assignments due tomorrow");

        let candidates = match self.db.scan_due_tomorrow(window).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("reminder scan failed, aborting run: {e}");
                summary.scan_failed = true;
                return summary;
            }
        };

        summary.scanned = candidates.len();
        info!("found {} assignments due tomorrow", candidates.len());

        for candidate in candidates {
            if !is_eligible(&candidate) {
                info!(
                    title = %candidate.title,
                    "skipping reminder - created less than 1 day before deadline"
                );
                continue;
            }
            summary.eligible += 1;
            self.process_candidate(&candidate, now, &mut summary).await;
        }

        info!(?summary, "reminder run finished");
        summary
    }

    /// Notify-then-mark for a single eligible candidate.
    async fn process_candidate(
        &self,
        candidate: &ReminderCandidate,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) {
        let delivered = self
            .mail
            .send_deadline_reminder(&candidate.user_email, &candidate.title, candidate.deadline)
            .await;

        if !delivered {
            warn!(title = %candidate.title, "failed to send reminder, leaving unmarked");
            summary.send_failed += 1;
            return;
        }
        summary.sent += 1;

        // Sole gate against duplicate sends. A failure here is the worst
        // case we accept: the email went out but the flag is unset.
        match self.db.mark_reminder_sent(candidate.assignment_id, now).await {
            Ok(()) => {
                info!(title = %candidate.title, "reminder sent and marked");
            }
            Err(e) => {
                error!(
                    title = %candidate.title,
                    "reminder sent but marking failed, duplicate send possible: {e}"
                );
                summary.mark_failed += 1;
            }
        }
    }

    /// Entry point for the daily clock. Absorbs all failures.
    pub async fn run_scheduled_check(&self) {
        info!("running daily reminder check");
        self.run(Utc::now()).await;
    }

    /// Entry point for the authenticated trigger endpoint. Runs the same
    /// pipeline synchronously and reports only coarse completion; callers
    /// wanting per-candidate detail must read the logs.
    pub async fn run_manual_check(&self) -> bool {
        info!("running immediate reminder check");
        let summary = self.run(Utc::now()).await;
        !summary.scan_failed
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Assignment, AssignmentStatus, NewAssignment, NewNote, Note, User, UserCredentials,
    };
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// In-memory assignment store implementing the scan and mark
    /// operations the pipeline uses. CRUD methods are not exercised here.
    struct FakeDb {
        assignments: Mutex<Vec<Assignment>>,
        email: String,
        fail_scan: bool,
        fail_mark_for: Mutex<HashSet<Uuid>>,
    }

    impl FakeDb {
        fn new(assignments: Vec<Assignment>) -> Self {
            Self {
                assignments: Mutex::new(assignments),
                email: "student@example.com".to_string(),
                fail_scan: false,
                fail_mark_for: Mutex::new(HashSet::new()),
            }
        }

        fn reminder_sent(&self, id: Uuid) -> bool {
            self.assignments
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .map(|a| a.reminder_sent)
                .unwrap_or(false)
        }
    }

    #[async_trait]
    impl DatabaseService for FakeDb {
        async fn create_user(&self, _: &str, _: &str) -> PortResult<User> {
            unimplemented!()
        }
        async fn get_user_by_email(&self, _: &str) -> PortResult<UserCredentials> {
            unimplemented!()
        }
        async fn get_user_by_id(&self, _: Uuid) -> PortResult<User> {
            unimplemented!()
        }
        async fn create_assignment(&self, _: Uuid, _: NewAssignment) -> PortResult<Assignment> {
            unimplemented!()
        }
        async fn list_assignments(&self, _: Uuid) -> PortResult<Vec<Assignment>> {
            unimplemented!()
        }
        async fn update_assignment_status(
            &self,
            _: Uuid,
            _: Uuid,
            _: AssignmentStatus,
        ) -> PortResult<Assignment> {
            unimplemented!()
        }
        async fn delete_assignment(&self, _: Uuid, _: Uuid) -> PortResult<()> {
            unimplemented!()
        }
        async fn create_note(&self, _: Uuid, _: NewNote) -> PortResult<Note> {
            unimplemented!()
        }
        async fn list_notes(&self, _: Uuid) -> PortResult<Vec<Note>> {
            unimplemented!()
        }
        async fn delete_note(&self, _: Uuid, _: Uuid) -> PortResult<()> {
            unimplemented!()
        }

        async fn scan_due_tomorrow(
            &self,
            window: ScanWindow,
        ) -> PortResult<Vec<ReminderCandidate>> {
            if self.fail_scan {
                return Err(PortError::Unexpected("database unavailable".to_string()));
            }
            let assignments = self.assignments.lock().unwrap();
            Ok(assignments
                .iter()
                .filter(|a| {
                    window.contains(a.deadline)
                        && !a.reminder_sent
                        && a.status != AssignmentStatus::Completed
                })
                .map(|a| ReminderCandidate {
                    assignment_id: a.id,
                    title: a.title.clone(),
                    deadline: a.deadline,
                    created_at: a.created_at,
                    user_email: self.email.clone(),
                })
                .collect())
        }

        async fn mark_reminder_sent(
            &self,
            assignment_id: Uuid,
            sent_at: DateTime<Utc>,
        ) -> PortResult<()> {
            if self.fail_mark_for.lock().unwrap().contains(&assignment_id) {
                return Err(PortError::Unexpected("write error".to_string()));
            }
            let mut assignments = self.assignments.lock().unwrap();
            if let Some(a) = assignments.iter_mut().find(|a| a.id == assignment_id) {
                a.reminder_sent = true;
                a.reminder_sent_at = Some(sent_at);
            }
            Ok(())
        }
    }

    /// Mail fake recording every attempted send; configurable to reject
    /// specific titles.
    struct FakeMail {
        sent: Mutex<Vec<(String, String)>>,
        reject_titles: HashSet<String>,
    }

    impl FakeMail {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reject_titles: HashSet::new(),
            }
        }

        fn rejecting(titles: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reject_titles: titles.iter().map(|t| t.to_string()).collect(),
            }
        }

        fn sent_titles(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl MailService for FakeMail {
        async fn send_deadline_reminder(
            &self,
            to_address: &str,
            assignment_title: &str,
            _deadline: DateTime<Utc>,
        ) -> bool {
            if self.reject_titles.contains(assignment_title) {
                return false;
            }
            self.sent
                .lock()
                .unwrap()
                .push((to_address.to_string(), assignment_title.to_string()));
            true
        }

        async fn test_connection(&self) -> bool {
            true
        }
    }

    fn assignment(
        title: &str,
        deadline: DateTime<Utc>,
        created_at: DateTime<Utc>,
        status: AssignmentStatus,
    ) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            deadline,
            status,
            created_at,
            reminder_sent: false,
            reminder_sent_at: None,
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn window_is_tomorrow_midnight_to_midnight() {
        let now = utc(2025, 6, 10, 15, 0, 0);
        let window = ScanWindow::due_tomorrow(now);
        assert_eq!(window.start, utc(2025, 6, 11, 0, 0, 0));
        assert_eq!(window.end, utc(2025, 6, 12, 0, 0, 0));
        assert!(window.contains(utc(2025, 6, 11, 23, 59, 0)));
        assert!(!window.contains(utc(2025, 6, 12, 0, 0, 1)));
        // End is exclusive, start inclusive.
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn window_does_not_depend_on_scan_time_of_day() {
        let morning = ScanWindow::due_tomorrow(utc(2025, 6, 10, 0, 30, 0));
        let evening = ScanWindow::due_tomorrow(utc(2025, 6, 10, 23, 30, 0));
        assert_eq!(morning, evening);
    }

    #[test]
    fn eligibility_requires_a_full_day_of_warning() {
        let created = utc(2025, 6, 10, 12, 0, 0);
        let short_notice = ReminderCandidate {
            assignment_id: Uuid::new_v4(),
            title: "Quiz".to_string(),
            deadline: created + Duration::hours(12),
            created_at: created,
            user_email: "s@example.com".to_string(),
        };
        let ample_notice = ReminderCandidate {
            deadline: created + Duration::hours(36),
            ..short_notice.clone()
        };
        assert!(!is_eligible(&short_notice));
        assert!(is_eligible(&ample_notice));
    }

    #[tokio::test]
    async fn completed_assignments_are_never_scanned() {
        let now = utc(2025, 6, 10, 9, 0, 0);
        let db = Arc::new(FakeDb::new(vec![assignment(
            "Done already",
            utc(2025, 6, 11, 12, 0, 0),
            utc(2025, 6, 1, 0, 0, 0),
            AssignmentStatus::Completed,
        )]));
        let mail = Arc::new(FakeMail::new());
        let summary = ReminderPipeline::new(db, mail.clone()).run(now).await;
        assert_eq!(summary.scanned, 0);
        assert!(mail.sent_titles().is_empty());
    }

    #[tokio::test]
    async fn end_to_end_send_marks_and_second_run_is_silent() {
        let now = utc(2025, 6, 10, 9, 0, 0);
        let essay = assignment(
            "Essay",
            utc(2025, 6, 11, 23, 59, 0),
            utc(2025, 5, 31, 9, 0, 0),
            AssignmentStatus::Pending,
        );
        let essay_id = essay.id;
        let db = Arc::new(FakeDb::new(vec![essay]));
        let mail = Arc::new(FakeMail::new());
        let pipeline = ReminderPipeline::new(db.clone(), mail.clone());

        let summary = pipeline.run(now).await;
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.eligible, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.send_failed, 0);
        assert_eq!(summary.mark_failed, 0);
        assert_eq!(mail.sent_titles(), vec!["Essay".to_string()]);
        assert!(db.reminder_sent(essay_id));
        {
            let assignments = db.assignments.lock().unwrap();
            assert_eq!(assignments[0].reminder_sent_at, Some(now));
        }

        // Same day, second run: the mark excludes it from the scan.
        let summary = pipeline.run(now).await;
        assert_eq!(summary.scanned, 0);
        assert_eq!(mail.sent_titles().len(), 1);
    }

    #[tokio::test]
    async fn one_delivery_failure_does_not_affect_other_candidates() {
        let now = utc(2025, 6, 10, 9, 0, 0);
        let created = utc(2025, 6, 1, 0, 0, 0);
        let deadline = utc(2025, 6, 11, 12, 0, 0);
        let a = assignment("First", deadline, created, AssignmentStatus::Pending);
        let b = assignment("Second", deadline, created, AssignmentStatus::InProgress);
        let c = assignment("Third", deadline, created, AssignmentStatus::Pending);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);

        let db = Arc::new(FakeDb::new(vec![a, b, c]));
        let mail = Arc::new(FakeMail::rejecting(&["Second"]));
        let summary = ReminderPipeline::new(db.clone(), mail.clone()).run(now).await;

        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.send_failed, 1);
        assert!(db.reminder_sent(a_id));
        assert!(!db.reminder_sent(b_id));
        assert!(db.reminder_sent(c_id));
    }

    #[tokio::test]
    async fn ineligible_candidate_in_window_is_suppressed() {
        let now = utc(2025, 6, 10, 23, 0, 0);
        // Due tomorrow noon but created today: only 13 hours of warning.
        let rushed = assignment(
            "Rushed",
            utc(2025, 6, 11, 12, 0, 0),
            utc(2025, 6, 10, 23, 0, 0),
            AssignmentStatus::Pending,
        );
        let db = Arc::new(FakeDb::new(vec![rushed]));
        let mail = Arc::new(FakeMail::new());
        let summary = ReminderPipeline::new(db, mail.clone()).run(now).await;

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.eligible, 0);
        assert!(mail.sent_titles().is_empty());
    }

    #[tokio::test]
    async fn scan_failure_aborts_the_run() {
        let mut db = FakeDb::new(vec![]);
        db.fail_scan = true;
        let mail = Arc::new(FakeMail::new());
        let pipeline = ReminderPipeline::new(Arc::new(db), mail.clone());

        let summary = pipeline.run(Utc::now()).await;
        assert!(summary.scan_failed);
        assert_eq!(summary.scanned, 0);
        assert!(!pipeline.run_manual_check().await);
    }

    #[tokio::test]
    async fn mark_failure_is_counted_but_does_not_stop_the_run() {
        let now = utc(2025, 6, 10, 9, 0, 0);
        let created = utc(2025, 6, 1, 0, 0, 0);
        let a = assignment("Alpha", utc(2025, 6, 11, 8, 0, 0), created, AssignmentStatus::Pending);
        let b = assignment("Beta", utc(2025, 6, 11, 9, 0, 0), created, AssignmentStatus::Pending);
        let (a_id, b_id) = (a.id, b.id);

        let db = Arc::new(FakeDb::new(vec![a, b]));
        db.fail_mark_for.lock().unwrap().insert(a_id);
        let mail = Arc::new(FakeMail::new());
        let summary = ReminderPipeline::new(db.clone(), mail.clone()).run(now).await;

        // Both emails went out; only the second got its durable mark.
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.mark_failed, 1);
        assert!(!db.reminder_sent(a_id));
        assert!(db.reminder_sent(b_id));
    }

    #[tokio::test]
    async fn manual_and_scheduled_runs_mutate_state_identically() {
        let now = Utc::now();
        let created = now - Duration::days(10);
        let deadline = ScanWindow::due_tomorrow(now).start + Duration::hours(12);
        let make_db = || {
            Arc::new(FakeDb::new(vec![assignment(
                "Shared",
                deadline,
                created,
                AssignmentStatus::Pending,
            )]))
        };

        let scheduled_db = make_db();
        let pipeline = ReminderPipeline::new(scheduled_db.clone(), Arc::new(FakeMail::new()));
        pipeline.run_scheduled_check().await;

        let manual_db = make_db();
        let pipeline = ReminderPipeline::new(manual_db.clone(), Arc::new(FakeMail::new()));
        assert!(pipeline.run_manual_check().await);

        let scheduled_marked = scheduled_db.assignments.lock().unwrap()[0].reminder_sent;
        let manual_marked = manual_db.assignments.lock().unwrap()[0].reminder_sent;
        assert!(scheduled_marked);
        assert_eq!(scheduled_marked, manual_marked);
    }
}
