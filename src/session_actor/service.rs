use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn, Instrument};

use super::error::SessionError;
use super::persistence::SessionStore;
use super::state::{
    cooldown_remaining, submit_blocker, Countdown, SessionState, SessionView, SubmissionConfirmation,
};
use crate::clients::{DistanceClient, SessionClient};
use crate::clock::Clock;
use crate::distance_actor::DistanceStatus;
use crate::domain::{CompletionRecord, Coordinate, DeliveryMethod, DraftField, OrderDraft, OrderPayload};
use crate::messages::{ServiceResponse, SessionRequest};
use crate::pricing::{quote, PricingInput};
use crate::services::{SubmissionError, SubmissionGateway, SubmissionReceipt};

/// A finished POST, routed back to the actor together with its caller.
struct SubmissionOutcome {
    payload: OrderPayload,
    result: Result<SubmissionReceipt, SubmissionError>,
    respond_to: ServiceResponse<SubmissionConfirmation, SessionError>,
}

/// Owns the order draft, the submit flow and the post-submission cooldown.
///
/// The submission POST runs as a background task so the actor keeps serving
/// views and ticks while it is in flight. The submit gate is evaluated here,
/// inside the actor, so two racing submits cannot both get through.
pub struct SessionService {
    receiver: mpsc::Receiver<SessionRequest>,
    store: SessionStore,
    distance: DistanceClient,
    gateway: Arc<dyn SubmissionGateway>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    outcomes_tx: mpsc::UnboundedSender<SubmissionOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<SubmissionOutcome>,
    countdown_tx: watch::Sender<Option<Countdown>>,
    state: SessionState,
    draft: OrderDraft,
    destination: Option<Coordinate>,
}

impl SessionService {
    pub fn new(
        buffer_size: usize,
        store: SessionStore,
        distance: DistanceClient,
        gateway: Arc<dyn SubmissionGateway>,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
    ) -> (Self, SessionClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (countdown_tx, countdown_rx) = watch::channel(None);
        let service = Self {
            receiver,
            store,
            distance,
            gateway,
            clock,
            cooldown,
            outcomes_tx,
            outcomes_rx,
            countdown_tx,
            state: SessionState::Drafting,
            draft: OrderDraft::default(),
            destination: None,
        };
        (service, SessionClient::new(sender, countdown_rx))
    }

    #[instrument(name = "session_service", skip(self))]
    pub async fn run(mut self) {
        info!("SessionService starting");
        self.restore().await;

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(SessionRequest::UpdateField { field, value, respond_to }) => {
                        let result = self.handle_update_field(field, value).await;
                        let _ = respond_to.send(result);
                    }
                    Some(SessionRequest::SetDestination { destination, respond_to }) => {
                        let result = self.handle_set_destination(destination).await;
                        let _ = respond_to.send(result);
                    }
                    Some(SessionRequest::GetView { respond_to }) => {
                        let _ = respond_to.send(Ok(self.view().await));
                    }
                    Some(SessionRequest::Submit { respond_to }) => {
                        self.handle_submit(respond_to).await;
                    }
                    Some(SessionRequest::StartNewOrder { respond_to }) => {
                        let result = self.handle_start_new_order().await;
                        let _ = respond_to.send(result);
                    }
                    Some(SessionRequest::Tick) => self.handle_tick(),
                    Some(SessionRequest::Shutdown) => {
                        info!("SessionService shutting down");
                        break;
                    }
                    None => break,
                },
                Some(outcome) = self.outcomes_rx.recv() => {
                    self.handle_submission_outcome(outcome).await;
                }
            }
        }

        info!("SessionService stopped");
    }

    /// Picks up where the last run left off: an unexpired completion resumes
    /// the cooldown, otherwise the stored draft fields are restored.
    async fn restore(&mut self) {
        match self.store.load_completion().await {
            Ok(Some(record)) => {
                let remaining = cooldown_remaining(record.completed_at, self.clock.now(), self.cooldown);
                if !remaining.is_zero() {
                    info!(remaining_ms = remaining.as_millis() as u64, "Resuming cooldown from last order");
                    self.enter_cooldown(record, remaining);
                    return;
                }
                info!("Clearing completion record from an elapsed cooldown");
                if let Err(e) = self.store.clear_completion().await {
                    warn!(error = %e, "Failed to clear completion record");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read completion record"),
        }

        match self.store.restore_draft().await {
            Ok(draft) => {
                debug!(missing = draft.missing_fields().len(), "Draft restored");
                self.draft = draft;
            }
            Err(e) => warn!(error = %e, "Failed to restore draft"),
        }
    }

    fn locked_reason(&self) -> Option<&'static str> {
        match self.state {
            SessionState::Drafting => None,
            SessionState::Submitting => Some("a submission is in progress"),
            SessionState::Cooldown { .. } => Some("the last order is being confirmed"),
        }
    }

    #[instrument(skip(self, value), fields(field = %field))]
    async fn handle_update_field(&mut self, field: DraftField, value: String) -> Result<SessionView, SessionError> {
        if let Some(reason) = self.locked_reason() {
            return Err(SessionError::Locked(reason));
        }

        let change = self.draft.apply(field, &value).map_err(SessionError::Validation)?;
        if let Err(e) = self.store.save_field(field, &change).await {
            warn!(error = %e, "Failed to persist field");
        }

        match field {
            // New address text invalidates the previously picked coordinate.
            DraftField::Address => {
                self.destination = None;
                self.sync_distance().await;
            }
            DraftField::DeliveryMethod => self.sync_distance().await,
            _ => {}
        }

        Ok(self.view().await)
    }

    #[instrument(skip(self))]
    async fn handle_set_destination(&mut self, destination: Option<Coordinate>) -> Result<SessionView, SessionError> {
        if let Some(reason) = self.locked_reason() {
            return Err(SessionError::Locked(reason));
        }
        self.destination = destination;
        self.sync_distance().await;
        Ok(self.view().await)
    }

    /// Pushes the effective destination to the resolver. Pickup orders have none.
    async fn sync_distance(&self) {
        let effective = match self.draft.delivery_method {
            DeliveryMethod::Delivered => self.destination,
            DeliveryMethod::Pickup => None,
        };
        if let Err(e) = self.distance.set_destination(effective).await {
            warn!(error = %e, "Distance resolver unavailable");
        }
    }

    async fn distance_status(&self) -> DistanceStatus {
        self.distance.status().await.unwrap_or_else(|e| {
            warn!(error = %e, "Distance resolver unavailable");
            DistanceStatus::Unknown
        })
    }

    async fn view(&self) -> SessionView {
        let distance = self.distance_status().await;
        SessionView {
            state: self.state.clone(),
            draft: self.draft.clone(),
            distance,
            breakdown: quote(&PricingInput::from_draft(&self.draft, distance.miles())),
            blocker: submit_blocker(&self.state, &self.draft, distance),
        }
    }

    #[instrument(skip(self, respond_to), fields(state = self.state.name()))]
    async fn handle_submit(&mut self, respond_to: ServiceResponse<SubmissionConfirmation, SessionError>) {
        let distance = self.distance_status().await;
        if let Some(blocker) = submit_blocker(&self.state, &self.draft, distance) {
            debug!(%blocker, "Submit refused");
            let _ = respond_to.send(Err(SessionError::NotReady(blocker)));
            return;
        }

        let missing = self.draft.missing_fields();
        if !missing.is_empty() {
            let _ = respond_to.send(Err(SessionError::Validation(format!(
                "Please complete: {}",
                missing.join(", ")
            ))));
            return;
        }

        let breakdown = quote(&PricingInput::from_draft(&self.draft, distance.miles()));
        let payload = OrderPayload::new(self.draft.clone(), distance.miles(), breakdown);
        info!(
            product = ?payload.draft.product,
            method = %payload.draft.delivery_method,
            grand_total = payload.grand_total,
            "Submitting order"
        );
        self.state = SessionState::Submitting;
        self.spawn_submission(payload, respond_to);
    }

    fn spawn_submission(
        &self,
        payload: OrderPayload,
        respond_to: ServiceResponse<SubmissionConfirmation, SessionError>,
    ) {
        let gateway = Arc::clone(&self.gateway);
        let outcomes = self.outcomes_tx.clone();
        let span = tracing::debug_span!("order_submission");

        tokio::spawn(
            async move {
                let result = gateway.submit(&payload).await;
                let _ = outcomes.send(SubmissionOutcome { payload, result, respond_to });
            }
            .instrument(span),
        );
    }

    #[instrument(skip(self, outcome))]
    async fn handle_submission_outcome(&mut self, outcome: SubmissionOutcome) {
        let SubmissionOutcome { payload, result, respond_to } = outcome;

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, "Order submission failed");
                self.state = SessionState::Drafting;
                let _ = respond_to.send(Err(SessionError::Submission(e)));
                return;
            }
        };

        if let Some(warning) = &receipt.warning {
            warn!(%warning, "Order accepted with a warning");
        }

        let record = CompletionRecord {
            completed_at: self.clock.now(),
            grand_total: payload.grand_total,
            draft: payload.draft,
        };
        if let Err(e) = self.store.save_completion(&record).await {
            warn!(error = %e, "Failed to persist completion record");
        }
        if let Err(e) = self.store.clear_draft().await {
            warn!(error = %e, "Failed to clear stored draft");
        }

        self.draft = OrderDraft::default();
        self.destination = None;
        self.sync_distance().await;
        self.enter_cooldown(record.clone(), self.cooldown);

        info!(grand_total = record.grand_total, "Order submitted");
        let _ = respond_to.send(Ok(SubmissionConfirmation { record, receipt }));
    }

    fn enter_cooldown(&mut self, record: CompletionRecord, remaining: Duration) {
        self.state = SessionState::Cooldown {
            record,
            remaining,
            new_order_available: remaining.is_zero(),
        };
        self.countdown_tx.send_replace(Some(Countdown::new(remaining)));
    }

    fn handle_tick(&mut self) {
        let now = self.clock.now();
        let cooldown = self.cooldown;
        let SessionState::Cooldown { record, remaining, new_order_available } = &mut self.state else {
            return;
        };

        *remaining = cooldown_remaining(record.completed_at, now, cooldown);
        if remaining.is_zero() && !*new_order_available {
            info!("Cooldown elapsed, new order available");
        }
        *new_order_available = remaining.is_zero();
        self.countdown_tx.send_replace(Some(Countdown::new(*remaining)));
    }

    #[instrument(skip(self), fields(state = self.state.name()))]
    async fn handle_start_new_order(&mut self) -> Result<SessionView, SessionError> {
        let completed_at = match &self.state {
            SessionState::Drafting => return Err(SessionError::NoCompletedOrder),
            SessionState::Submitting => return Err(SessionError::Locked("a submission is in progress")),
            SessionState::Cooldown { record, .. } => record.completed_at,
        };

        let remaining = cooldown_remaining(completed_at, self.clock.now(), self.cooldown);
        if !remaining.is_zero() {
            return Err(SessionError::CooldownActive {
                remaining_secs: remaining.as_secs_f64().ceil() as u64,
            });
        }

        if let Err(e) = self.store.clear_completion().await {
            warn!(error = %e, "Failed to clear completion record");
        }
        if let Err(e) = self.store.clear_draft().await {
            warn!(error = %e, "Failed to clear stored draft");
        }

        self.state = SessionState::Drafting;
        self.draft = OrderDraft::default();
        self.destination = None;
        self.sync_distance().await;
        self.countdown_tx.send_replace(None);

        info!("Started a new order");
        Ok(self.view().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::distance_actor::DistanceService;
    use crate::domain::Product;
    use crate::mock_framework::{
        create_mock_gateway, create_mock_routing, expect_route_call, expect_submission, RouteCall, SubmissionCall,
    };
    use crate::session_actor::SubmitBlocker;
    use crate::storage::{KeyValueStore, MemoryStore, StorageError};
    use chrono::{TimeZone, Utc};

    const COOLDOWN: Duration = Duration::from_secs(300);
    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    const WAREHOUSE: Coordinate = Coordinate { longitude: -120.26, latitude: 37.12 };

    struct Harness {
        client: SessionClient,
        routes: mpsc::Receiver<RouteCall>,
        submissions: mpsc::Receiver<SubmissionCall>,
        memory: MemoryStore,
        clock: ManualClock,
    }

    fn start() -> Harness {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        let memory = MemoryStore::new(Arc::new(clock.clone()));
        start_with(memory, clock)
    }

    fn start_with(memory: MemoryStore, clock: ManualClock) -> Harness {
        let (client, routes, submissions) = spawn_session(Arc::new(memory.clone()), &clock);
        Harness { client, routes, submissions, memory, clock }
    }

    fn spawn_session(
        backend: Arc<dyn KeyValueStore>,
        clock: &ManualClock,
    ) -> (SessionClient, mpsc::Receiver<RouteCall>, mpsc::Receiver<SubmissionCall>) {
        let (routing, routes) = create_mock_routing(10);
        let (gateway, submissions) = create_mock_gateway(10);
        let (distance_service, distance) = DistanceService::new(10, routing, WAREHOUSE);
        tokio::spawn(distance_service.run());

        let store = SessionStore::new(backend, WEEK);
        let (service, client) = SessionService::new(10, store, distance, gateway, Arc::new(clock.clone()), COOLDOWN);
        tokio::spawn(service.run());

        (client, routes, submissions)
    }

    /// Reads as empty and refuses every write.
    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        async fn set(&self, key: &str, _value: String, _ttl: Option<Duration>) -> Result<(), StorageError> {
            Err(StorageError::Backend(format!("cannot write {key}")))
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    async fn settle(client: &SessionClient) -> SessionView {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        client.view().await.unwrap()
    }

    async fn fill_contact(client: &SessionClient) {
        client.update_field(DraftField::FirstName, "Jane").await.unwrap();
        client.update_field(DraftField::LastName, "Farmer").await.unwrap();
        client.update_field(DraftField::Email, "jane@farm.com").await.unwrap();
        client.update_field(DraftField::Phone, "5551234567").await.unwrap();
    }

    #[tokio::test]
    async fn test_field_edits_reprice_and_persist() {
        let h = start();
        h.client.update_field(DraftField::Product, "alfalfa").await.unwrap();
        h.client.update_field(DraftField::Unit, "block").await.unwrap();
        let view = h.client.update_field(DraftField::Quantity, "2").await.unwrap();

        assert_eq!(view.breakdown.product_subtotal, 2072.0);
        assert_eq!(view.breakdown.grand_total, 2072.0);
        assert_eq!(h.memory.get("form_quantity").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_invalid_enum_value_is_rejected_and_not_stored() {
        let h = start();
        let err = h.client.update_field(DraftField::Unit, "pallet").await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert_eq!(h.memory.get("form_unit").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_switching_to_pickup_resets_distance_and_fee() {
        let mut h = start();
        h.client.update_field(DraftField::Product, "wheat").await.unwrap();
        h.client.update_field(DraftField::Unit, "truck").await.unwrap();
        h.client.update_field(DraftField::Quantity, "1").await.unwrap();
        h.client.update_field(DraftField::DeliveryMethod, "delivered").await.unwrap();
        let view = h
            .client
            .select_place("12 Ranch Rd", Some(Coordinate::new(-119.8, 36.7)))
            .await
            .unwrap();
        assert_eq!(view.distance, DistanceStatus::Calculating);
        assert_eq!(view.blocker, Some(SubmitBlocker::CalculatingDistance));

        let call = expect_route_call(&mut h.routes).await.expect("Expected route call");
        call.respond_to.send(Ok(40_716.302)).unwrap();
        let view = settle(&h.client).await;
        assert_eq!(view.breakdown.delivery_fee, 101.2);
        assert_eq!(view.breakdown.grand_total, 5101.2);

        for _ in 0..2 {
            let view = h.client.update_field(DraftField::DeliveryMethod, "pickup").await.unwrap();
            assert_eq!(view.distance, DistanceStatus::Unknown);
            assert_eq!(view.breakdown.delivery_fee, 0.0);
            assert_eq!(view.breakdown.grand_total, 5000.0);
        }
    }

    #[tokio::test]
    async fn test_delivery_without_resolved_distance_cannot_submit() {
        let h = start();
        fill_contact(&h.client).await;
        h.client.update_field(DraftField::Product, "wheat").await.unwrap();
        h.client.update_field(DraftField::Quantity, "10").await.unwrap();
        let view = h.client.update_field(DraftField::DeliveryMethod, "delivered").await.unwrap();
        assert_eq!(view.blocker, Some(SubmitBlocker::DistanceUnresolved));

        let err = h.client.submit().await.unwrap_err();
        assert_eq!(err, SessionError::NotReady(SubmitBlocker::DistanceUnresolved));
    }

    #[tokio::test]
    async fn test_incomplete_draft_fails_validation() {
        let h = start();
        h.client.update_field(DraftField::FirstName, "Jane").await.unwrap();
        let err = h.client.submit().await.unwrap_err();
        match err {
            SessionError::Validation(message) => {
                assert!(message.contains("lastName"));
                assert!(message.contains("product"));
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_submission_returns_to_drafting_with_draft_kept() {
        let mut h = start();
        fill_contact(&h.client).await;
        h.client.update_field(DraftField::Product, "alfalfa").await.unwrap();
        h.client.update_field(DraftField::Quantity, "3").await.unwrap();

        let client = h.client.clone();
        let pending = tokio::spawn(async move { client.submit().await });

        let call = expect_submission(&mut h.submissions).await.expect("Expected submission");
        assert_eq!(call.payload.product_subtotal, 42.0);
        assert_eq!(call.payload.distance, None);

        let view = h.client.view().await.unwrap();
        assert_eq!(view.state, SessionState::Submitting);
        assert_eq!(
            h.client.submit().await.unwrap_err(),
            SessionError::NotReady(SubmitBlocker::SubmissionPending)
        );
        assert!(matches!(
            h.client.update_field(DraftField::Notes, "late edit").await,
            Err(SessionError::Locked(_))
        ));

        call.respond_to
            .send(Err(SubmissionError::Rejected { status: 500, message: "Sheets unavailable".into() }))
            .unwrap();
        assert!(matches!(pending.await.unwrap(), Err(SessionError::Submission(_))));

        let view = h.client.view().await.unwrap();
        assert_eq!(view.state, SessionState::Drafting);
        assert_eq!(view.draft.product, Some(Product::Alfalfa));
        assert_eq!(h.memory.get("form_firstName").await.unwrap().as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn test_successful_submission_enters_cooldown_until_it_elapses() {
        let mut h = start();
        fill_contact(&h.client).await;
        h.client.update_field(DraftField::Product, "wheat").await.unwrap();
        h.client.update_field(DraftField::Quantity, "5").await.unwrap();

        let client = h.client.clone();
        let pending = tokio::spawn(async move { client.submit().await });
        let call = expect_submission(&mut h.submissions).await.expect("Expected submission");
        call.respond_to
            .send(Ok(SubmissionReceipt { warning: Some("ledger read-only".into()) }))
            .unwrap();

        let confirmation = pending.await.unwrap().unwrap();
        assert_eq!(confirmation.record.grand_total, 50.0);
        assert_eq!(confirmation.record.draft.first_name, "Jane");
        assert_eq!(confirmation.receipt.warning.as_deref(), Some("ledger read-only"));
        assert_eq!(h.memory.get("form_firstName").await.unwrap(), None);
        assert!(h.memory.get("order_completed_at").await.unwrap().is_some());

        let view = h.client.view().await.unwrap();
        assert_eq!(view.draft, OrderDraft::default());
        assert_eq!(view.blocker, Some(SubmitBlocker::CooldownActive));
        assert!(matches!(
            h.client.update_field(DraftField::FirstName, "Again").await,
            Err(SessionError::Locked(_))
        ));

        h.clock.advance(chrono::Duration::seconds(120));
        assert_eq!(
            h.client.start_new_order().await.unwrap_err(),
            SessionError::CooldownActive { remaining_secs: 180 }
        );
        h.client.tick().await.unwrap();
        let view = h.client.view().await.unwrap();
        assert_eq!(*h.client.countdown().borrow(), Some(Countdown::new(Duration::from_secs(180))));
        assert!(matches!(view.state, SessionState::Cooldown { new_order_available: false, .. }));

        h.clock.advance(chrono::Duration::seconds(180));
        h.client.tick().await.unwrap();
        let view = h.client.view().await.unwrap();
        assert!(matches!(view.state, SessionState::Cooldown { new_order_available: true, .. }));

        let view = h.client.start_new_order().await.unwrap();
        assert_eq!(view.state, SessionState::Drafting);
        assert_eq!(*h.client.countdown().borrow(), None);
        assert!(h.memory.is_empty());
    }

    #[tokio::test]
    async fn test_new_order_requires_a_completed_one() {
        let h = start();
        assert_eq!(h.client.start_new_order().await.unwrap_err(), SessionError::NoCompletedOrder);
    }

    #[tokio::test]
    async fn test_storage_write_failures_do_not_fail_the_session() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        let (client, _routes, mut submissions) = spawn_session(Arc::new(ReadOnlyStore), &clock);

        fill_contact(&client).await;
        client.update_field(DraftField::Product, "alfalfa").await.unwrap();
        let view = client.update_field(DraftField::Quantity, "2").await.unwrap();
        assert_eq!(view.draft.first_name, "Jane");
        assert_eq!(view.breakdown.grand_total, 28.0);

        let submitter = client.clone();
        let pending = tokio::spawn(async move { submitter.submit().await });
        let call = expect_submission(&mut submissions).await.expect("Expected submission");
        call.respond_to.send(Ok(SubmissionReceipt::default())).unwrap();

        let confirmation = pending.await.unwrap().unwrap();
        assert_eq!(confirmation.record.grand_total, 28.0);
        let view = client.view().await.unwrap();
        assert!(matches!(view.state, SessionState::Cooldown { new_order_available: false, .. }));
    }
}
