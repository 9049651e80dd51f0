//! Appointment booking workflow
//!
//! A state machine driving date selection, slot retrieval, slot choice,
//! and submission. The machine itself is synchronous; `BookingSession`
//! wraps it with the async API calls and keeps one request in flight
//! per workflow instance.
//!
//! Slot fetches are tagged with a generation number. A late-arriving
//! response whose generation no longer matches the machine is dropped,
//! so a slow fetch for a previously selected date can never overwrite
//! the slots of the currently selected one.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use tider_core::{AppState, Booking};
use tider_net::error as net;
use tracing::{debug, info, warn};

/// Workflow states, in transition order
#[derive(Debug, Clone, PartialEq)]
pub enum BookingState {
    /// No date picked; nothing fetched
    Idle,
    /// A slot fetch is in flight for this date
    SlotsLoading { date: NaiveDate },
    /// Slots displayed for this date.
    ///
    /// `degraded` marks a failed fetch that was substituted with an
    /// empty list; a genuinely fully-booked day leaves it unset.
    SlotsReady {
        date: NaiveDate,
        slots: Vec<DateTime<Utc>>,
        degraded: bool,
    },
    /// One slot picked from the displayed list
    SlotChosen {
        date: NaiveDate,
        slots: Vec<DateTime<Utc>>,
        slot: DateTime<Utc>,
    },
    /// Submission in flight. Carries the chosen-slot context so a
    /// transport failure can restore it.
    Submitting {
        date: NaiveDate,
        slots: Vec<DateTime<Utc>>,
        slot: DateTime<Utc>,
    },
    /// Server accepted the booking
    Confirmed(Booking),
    /// Server rejected the booking; reset and re-fetch to retry
    Failed { reason: String },
}

/// Reasons a transition is refused. The machine stays where it was.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("A booking submission is already in flight")]
    Busy,
    #[error("No slot list is currently displayed")]
    NoSlots,
    #[error("That slot is not in the displayed list")]
    UnknownSlot,
    #[error("Sign in to book an appointment")]
    NoIdentity,
}

/// Tag for an issued slot fetch; stale tags are ignored on completion
#[derive(Debug)]
pub struct SlotRequest {
    date: NaiveDate,
    generation: u64,
}

impl SlotRequest {
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Tag for an issued submission
#[derive(Debug)]
pub struct SubmitTicket {
    slot: DateTime<Utc>,
    user_id: String,
    generation: u64,
}

impl SubmitTicket {
    pub fn slot(&self) -> DateTime<Utc> {
        self.slot
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// The synchronous state machine
pub struct BookingWorkflow {
    state: BookingState,
    generation: u64,
}

impl Default for BookingWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingWorkflow {
    pub fn new() -> Self {
        Self {
            state: BookingState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    /// Pick a date. Discards any displayed or chosen slots immediately
    /// and invalidates every outstanding fetch.
    ///
    /// Refused only while a submission is in flight.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<SlotRequest, BookingError> {
        if matches!(self.state, BookingState::Submitting { .. }) {
            return Err(BookingError::Busy);
        }

        self.generation += 1;
        self.state = BookingState::SlotsLoading { date };
        debug!(date = %date, generation = self.generation, "Slot fetch issued");
        Ok(SlotRequest {
            date,
            generation: self.generation,
        })
    }

    /// Apply the outcome of a slot fetch.
    ///
    /// A response for a superseded request is dropped. A failed fetch
    /// degrades to an empty, degraded slot list rather than an error:
    /// the user sees "no slots" and can pick another date.
    pub fn apply_slots(&mut self, request: SlotRequest, result: net::Result<Vec<DateTime<Utc>>>) {
        if request.generation != self.generation {
            debug!(
                date = %request.date,
                generation = request.generation,
                current = self.generation,
                "Ignoring stale slot response"
            );
            return;
        }

        match result {
            Ok(slots) => {
                debug!(date = %request.date, count = slots.len(), "Slots applied");
                self.state = BookingState::SlotsReady {
                    date: request.date,
                    slots,
                    degraded: false,
                };
            }
            Err(e) => {
                warn!(date = %request.date, error = %e, "Slot fetch failed, degrading to empty list");
                self.state = BookingState::SlotsReady {
                    date: request.date,
                    slots: Vec::new(),
                    degraded: true,
                };
            }
        }
    }

    /// Choose a slot from the currently displayed list
    pub fn choose_slot(&mut self, slot: DateTime<Utc>) -> Result<(), BookingError> {
        let BookingState::SlotsReady { date, slots, .. } = &self.state else {
            return Err(BookingError::NoSlots);
        };
        if !slots.contains(&slot) {
            return Err(BookingError::UnknownSlot);
        }

        self.state = BookingState::SlotChosen {
            date: *date,
            slots: slots.clone(),
            slot,
        };
        Ok(())
    }

    /// Begin submission of the chosen slot.
    ///
    /// Refused without a resolved user identity: a booking must never
    /// be submitted with an unresolved actor. The machine stays in
    /// `SlotChosen` so the user can sign in and retry.
    pub fn begin_submit(&mut self, user_id: Option<String>) -> Result<SubmitTicket, BookingError> {
        let BookingState::SlotChosen { date, slots, slot } = &self.state else {
            return Err(BookingError::NoSlots);
        };
        let Some(user_id) = user_id else {
            warn!("Booking submission refused: no resolved user identity");
            return Err(BookingError::NoIdentity);
        };

        let slot = *slot;
        let date = *date;
        let slots = slots.clone();
        self.generation += 1;
        self.state = BookingState::Submitting { date, slots, slot };
        Ok(SubmitTicket {
            slot,
            user_id,
            generation: self.generation,
        })
    }

    /// Apply the outcome of a submission.
    ///
    /// Acceptance captures the server's confirmation id as
    /// authoritative; a missing id gets a last-resort placeholder.
    /// A transport failure never reached the server, so the chosen
    /// slot is restored and the user can simply retry. An actual
    /// rejection (including a slot taken by another booker between
    /// fetch and submit) lands in `Failed`; no automatic retry, the
    /// user must reset and fetch fresh slots.
    pub fn apply_submit(&mut self, ticket: SubmitTicket, result: net::Result<Option<String>>) {
        if ticket.generation != self.generation {
            debug!("Ignoring stale submission response");
            return;
        }

        match result {
            Ok(confirmation_id) => {
                let confirmation_id = confirmation_id.unwrap_or_else(|| {
                    warn!("No confirmation id from server, generating placeholder");
                    format!("APP-{}", Utc::now().timestamp_millis())
                });
                info!(confirmation = %confirmation_id, "Booking confirmed");
                self.state = BookingState::Confirmed(Booking::new(
                    ticket.slot,
                    ticket.user_id,
                    confirmation_id,
                ));
            }
            Err(e) if e.is_transport() => {
                warn!(error = %e, "Submission never reached the server, slot still chosen");
                let prior = std::mem::replace(&mut self.state, BookingState::Idle);
                if let BookingState::Submitting { date, slots, slot } = prior {
                    self.state = BookingState::SlotChosen { date, slots, slot };
                }
            }
            Err(e) => {
                warn!(error = %e, "Booking rejected");
                self.state = BookingState::Failed {
                    reason: e.to_string(),
                };
            }
        }
    }

    /// Return to `Idle`, dropping any slot list. A fresh date pick is
    /// required afterwards; slots are date-scoped and time-sensitive.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = BookingState::Idle;
    }
}

/// The slice of the API the workflow needs. Mocked in tests.
pub trait BookingApi: Send + Sync {
    fn fetch_slots(
        &self,
        date: NaiveDate,
    ) -> impl std::future::Future<Output = net::Result<Vec<DateTime<Utc>>>> + Send;

    fn create_appointment(
        &self,
        slot: DateTime<Utc>,
        user_id: &str,
    ) -> impl std::future::Future<Output = net::Result<Option<String>>> + Send;
}

impl BookingApi for tider_net::ApiClient {
    async fn fetch_slots(&self, date: NaiveDate) -> net::Result<Vec<DateTime<Utc>>> {
        tider_net::ApiClient::fetch_slots(self, date).await
    }

    async fn create_appointment(
        &self,
        slot: DateTime<Utc>,
        user_id: &str,
    ) -> net::Result<Option<String>> {
        tider_net::ApiClient::create_appointment(self, slot, user_id).await
    }
}

/// Async driver binding the machine to the API and the app state
pub struct BookingSession<A: BookingApi> {
    api: A,
    app: Arc<AppState>,
    workflow: Mutex<BookingWorkflow>,
}

impl<A: BookingApi> BookingSession<A> {
    pub fn new(api: A, app: Arc<AppState>) -> Self {
        Self {
            api,
            app,
            workflow: Mutex::new(BookingWorkflow::new()),
        }
    }

    /// Current workflow state
    pub fn state(&self) -> BookingState {
        self.workflow.lock().unwrap().state().clone()
    }

    /// Pick a date and fetch its slots
    pub async fn pick_date(&self, date: NaiveDate) -> Result<(), BookingError> {
        let request = self.workflow.lock().unwrap().select_date(date)?;
        let was_valid = self.app.session().is_valid();

        let result = self.api.fetch_slots(date).await;
        self.handle_auth_rejection(&result.as_ref().err());

        if self.terminated_during_flight(was_valid) {
            return Ok(());
        }
        self.workflow.lock().unwrap().apply_slots(request, result);
        Ok(())
    }

    /// Choose a slot from the displayed list
    pub fn choose_slot(&self, slot: DateTime<Utc>) -> Result<(), BookingError> {
        self.workflow.lock().unwrap().choose_slot(slot)
    }

    /// Submit the chosen slot as the current user
    pub async fn submit(&self) -> Result<(), BookingError> {
        let user_id = self.app.session().current_user_id();
        let ticket = self.workflow.lock().unwrap().begin_submit(user_id)?;
        let was_valid = self.app.session().is_valid();

        let result = self
            .api
            .create_appointment(ticket.slot(), ticket.user_id())
            .await;
        self.handle_auth_rejection(&result.as_ref().err());

        if self.terminated_during_flight(was_valid) {
            return Ok(());
        }
        self.workflow.lock().unwrap().apply_submit(ticket, result);
        Ok(())
    }

    /// Dismiss a confirmation or failure and start over
    pub fn reset(&self) {
        self.workflow.lock().unwrap().reset();
    }

    /// A 401 means the server no longer accepts the token: log out.
    fn handle_auth_rejection(&self, error: &Option<&net::Error>) {
        if matches!(error, Some(net::Error::Unauthorized)) {
            warn!("Server rejected session during booking, logging out");
            if let Err(e) = self.app.logout() {
                warn!(error = %e, "Logout after 401 failed");
            }
        }
    }

    /// A completion arriving after the session it belonged to ended is
    /// discarded; the result must not mutate workflow state.
    fn terminated_during_flight(&self, was_valid: bool) -> bool {
        if was_valid && !self.app.session().is_valid() {
            warn!("Discarding booking result for a terminated session");
            self.workflow.lock().unwrap().reset();
            return true;
        }
        false
    }
}
