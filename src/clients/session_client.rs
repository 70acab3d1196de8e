use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, instrument};

use super::macros::{client_method, client_signal};
use crate::domain::{Coordinate, DraftField};
use crate::messages::SessionRequest;
use crate::session_actor::{Countdown, SessionError, SessionView, SubmissionConfirmation};

/// Handle to the order session actor.
#[derive(Clone)]
pub struct SessionClient {
    sender: mpsc::Sender<SessionRequest>,
    countdown: watch::Receiver<Option<Countdown>>,
}

impl SessionClient {
    pub fn new(sender: mpsc::Sender<SessionRequest>, countdown: watch::Receiver<Option<Countdown>>) -> Self {
        Self { sender, countdown }
    }

    /// Edits one form field. The value is not recorded in the span since it
    /// may hold contact details.
    #[instrument(skip(self, value), fields(field = %field))]
    pub async fn update_field(&self, field: DraftField, value: impl Into<String>) -> Result<SessionView, SessionError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(SessionRequest::UpdateField {
                field,
                value: value.into(),
                respond_to,
            })
            .await
            .map_err(|_| SessionError::ActorCommunicationError("Actor closed".to_string()))?;

        response
            .await
            .map_err(|_| SessionError::ActorCommunicationError("Actor dropped".to_string()))?
    }

    /// Records a place picked from the address autocomplete: the address text
    /// and, when the geocoder resolved it, its coordinate.
    pub async fn select_place(&self, address: impl Into<String>, destination: Option<Coordinate>) -> Result<SessionView, SessionError> {
        self.update_field(DraftField::Address, address).await?;
        self.set_destination(destination).await
    }

    /// Countdown updates published while the session is in cooldown.
    pub fn countdown(&self) -> watch::Receiver<Option<Countdown>> {
        self.countdown.clone()
    }
}

client_method!(SessionClient => fn set_destination(destination: Option<Coordinate>) -> SessionView as SessionRequest::SetDestination, Error = SessionError);
client_method!(SessionClient => fn view() -> SessionView as SessionRequest::GetView, Error = SessionError);
client_method!(SessionClient => fn submit() -> SubmissionConfirmation as SessionRequest::Submit, Error = SessionError);
client_method!(SessionClient => fn start_new_order() -> SessionView as SessionRequest::StartNewOrder, Error = SessionError);
client_signal!(SessionClient => fn tick() as SessionRequest::Tick, Error = SessionError);
client_signal!(SessionClient => fn shutdown() as SessionRequest::Shutdown, Error = SessionError);
