//! In-memory view model driving the attendance form and list.
//!
//! # Responsibility
//! - Own the student list shown to the user and the pending form value.
//! - Apply add/increment commands from confirmed store results only.
//! - Subscribe to session events for the lifetime of the controller.
//!
//! # Invariants
//! - `students` only ever holds rows the store confirmed; a failed command
//!   leaves it untouched (except dropping a row the store reports missing).
//! - Commands take `&mut self`, so one controller issues store calls one at
//!   a time and per-student calls reach the store in issue order.
//! - Phase moves `Uninitialized -> Loading -> Ready`, then stays `Ready`.
//! - `Ready { pending: true }` never outlives its command, even when the
//!   command future is dropped before completion.

use crate::model::student::{normalize_name, StudentId, StudentView};
use crate::service::sync_client::{SyncClient, SyncError, SyncResult};
use crate::session::{SessionEvent, SessionNotifier, SessionSubscription};
use crate::store::StudentStore;
use log::{debug, warn};

pub const PAGE_TITLE: &str = "Attendance Tracker";
pub const EMPTY_LIST_MESSAGE: &str = "No students added yet.";

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Uninitialized,
    Loading,
    /// `pending` is set while a command's store call is outstanding.
    Ready { pending: bool },
}

/// One rendered list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: StudentId,
    pub label: String,
    pub mark_present_enabled: bool,
}

/// Presentation model for one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceView {
    pub title: &'static str,
    pub form_value: String,
    pub submit_enabled: bool,
    pub rows: Vec<RowView>,
    /// Set when there are no rows to show.
    pub empty_message: Option<&'static str>,
    pub error_banner: Option<String>,
}

pub struct AttendanceController<S: StudentStore + ?Sized> {
    client: SyncClient<S>,
    students: Vec<StudentView>,
    pending_name: String,
    phase: ControllerPhase,
    load_failed: bool,
    last_error: Option<SyncError>,
    subscription: Option<SessionSubscription>,
    session_active: bool,
}

impl<S: StudentStore + ?Sized> AttendanceController<S> {
    pub fn new(client: SyncClient<S>) -> Self {
        Self {
            client,
            students: Vec::new(),
            pending_name: String::new(),
            phase: ControllerPhase::Uninitialized,
            load_failed: false,
            last_error: None,
            subscription: None,
            session_active: false,
        }
    }

    /// Subscribes to `session` and performs the initial load.
    ///
    /// On load failure the list stays empty, `load_failed()` turns true and
    /// the controller is still `Ready` so the user can retry with `reload`.
    pub async fn start(&mut self, session: &SessionNotifier) -> SyncResult<()> {
        if self.subscription.is_none() {
            self.subscription = Some(session.subscribe());
        }
        if self.phase != ControllerPhase::Uninitialized {
            return Ok(());
        }
        self.load().await
    }

    /// Replaces the list wholesale with a fresh `fetch_all`.
    pub async fn reload(&mut self) -> SyncResult<()> {
        self.ensure_started()?;
        self.load().await
    }

    /// Releases the session subscription.
    pub fn shutdown(&mut self) {
        if self.subscription.take().is_some() {
            debug!("event=controller_shutdown module=controller status=ok");
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn students(&self) -> &[StudentView] {
        &self.students
    }

    pub fn pending_name(&self) -> &str {
        &self.pending_name
    }

    pub fn set_pending_name(&mut self, value: impl Into<String>) {
        self.pending_name = value.into();
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    pub fn session_active(&self) -> bool {
        self.session_active
    }

    /// Whether the add and mark-present controls accept input.
    pub fn can_submit(&self) -> bool {
        self.phase == ControllerPhase::Ready { pending: false }
    }

    /// Adds a student named by the pending form value.
    ///
    /// On success the confirmed row is appended and the form is cleared. On
    /// failure nothing changes and the form keeps its value.
    pub async fn submit_add(&mut self) -> SyncResult<StudentView> {
        self.ensure_started()?;
        if let Err(err) = normalize_name(&self.pending_name) {
            return Err(self.fail(err.into()));
        }

        let pending = PendingGuard::enter(&mut self.phase);
        let result = self.client.add_student(&self.pending_name).await;
        drop(pending);

        match result {
            Ok(student) => {
                self.students.push(student.clone());
                self.pending_name.clear();
                self.last_error = None;
                Ok(student)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Marks student `id` present and applies the confirmed count.
    ///
    /// A `NotFound` answer drops the stale row.
    pub async fn request_increment(&mut self, id: StudentId) -> SyncResult<StudentView> {
        self.ensure_started()?;

        let pending = PendingGuard::enter(&mut self.phase);
        let result = self.client.mark_present(id).await;
        drop(pending);

        match result {
            Ok(updated) => {
                if let Some(row) = self.students.iter_mut().find(|row| row.id == updated.id) {
                    *row = updated.clone();
                }
                self.last_error = None;
                Ok(updated)
            }
            Err(SyncError::NotFound(missing)) => {
                self.students.retain(|row| row.id != missing);
                debug!("event=controller_drop_row module=controller status=ok id={missing}");
                Err(self.fail(SyncError::NotFound(missing)))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Applies every session event published since the last poll.
    pub fn poll_session(&mut self) -> Vec<SessionEvent> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Vec::new();
        };

        let events = subscription.drain();
        for event in &events {
            match event {
                SessionEvent::SignedIn { .. } | SessionEvent::TokenRefreshed => {
                    self.session_active = true;
                }
                SessionEvent::SignedOut => self.session_active = false,
            }
        }
        events
    }

    pub fn render(&self) -> AttendanceView {
        let enabled = self.can_submit();
        let rows: Vec<RowView> = self
            .students
            .iter()
            .map(|student| RowView {
                id: student.id,
                label: student.label(),
                mark_present_enabled: enabled,
            })
            .collect();

        AttendanceView {
            title: PAGE_TITLE,
            form_value: self.pending_name.clone(),
            submit_enabled: enabled,
            empty_message: rows.is_empty().then_some(EMPTY_LIST_MESSAGE),
            rows,
            error_banner: self.last_error.as_ref().map(banner_text),
        }
    }

    async fn load(&mut self) -> SyncResult<()> {
        self.phase = ControllerPhase::Loading;
        let result = self.client.fetch_all().await;
        self.phase = ControllerPhase::Ready { pending: false };

        match result {
            Ok(students) => {
                self.students = students;
                self.load_failed = false;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.load_failed = true;
                Err(self.fail(err))
            }
        }
    }

    fn ensure_started(&self) -> SyncResult<()> {
        match self.phase {
            ControllerPhase::Ready { .. } => Ok(()),
            phase => Err(SyncError::Unexpected(format!(
                "controller not ready (phase {phase:?})"
            ))),
        }
    }

    fn fail(&mut self, err: SyncError) -> SyncError {
        warn!(
            "event=controller_command module=controller status=error retryable={} error={}",
            err.is_retryable(),
            err
        );
        self.last_error = Some(err.clone());
        err
    }
}

/// Marks a command in flight and clears the mark on drop.
struct PendingGuard<'a> {
    phase: &'a mut ControllerPhase,
}

impl<'a> PendingGuard<'a> {
    fn enter(phase: &'a mut ControllerPhase) -> Self {
        *phase = ControllerPhase::Ready { pending: true };
        Self { phase }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        *self.phase = ControllerPhase::Ready { pending: false };
    }
}

fn banner_text(err: &SyncError) -> String {
    if err.is_retryable() {
        format!("{err}. Please try again.")
    } else {
        err.to_string()
    }
}
