use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiCompletion, ApiRequest, ShapeApi};
use crate::state::ToolKind;

pub(crate) const COMPLETION_POLL_INTERVAL: Duration = Duration::from_millis(24);

/// Where requests run. Inline execution keeps tests deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Inline,
    Background,
}

/// Identifies which tool activation a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTicket {
    pub sequence: u64,
    pub tool: Option<ToolKind>,
    pub generation: u64,
}

#[derive(Debug)]
pub struct Completion {
    pub ticket: OperationTicket,
    pub outcome: ApiCompletion,
}

pub struct RequestWorker {
    api: Arc<dyn ShapeApi>,
    dispatch: Dispatch,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
    next_sequence: u64,
    in_flight: usize,
}

impl RequestWorker {
    pub fn new(api: Arc<dyn ShapeApi>, dispatch: Dispatch) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            dispatch,
            tx,
            rx,
            next_sequence: 0,
            in_flight: 0,
        }
    }

    pub fn api(&self) -> &dyn ShapeApi {
        self.api.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn dispatch(
        &mut self,
        tool: Option<ToolKind>,
        generation: u64,
        request: ApiRequest,
    ) -> OperationTicket {
        self.next_sequence += 1;
        let ticket = OperationTicket {
            sequence: self.next_sequence,
            tool,
            generation,
        };
        self.in_flight += 1;
        tracing::debug!(
            sequence = ticket.sequence,
            operation = request.operation(),
            ?tool,
            "dispatching request"
        );

        match self.dispatch {
            Dispatch::Inline => {
                let outcome = request.execute(self.api.as_ref());
                let _ = self.tx.send(Completion { ticket, outcome });
            }
            Dispatch::Background => {
                let api = Arc::clone(&self.api);
                let tx = self.tx.clone();
                std::thread::spawn(move || {
                    let outcome = request.execute(api.as_ref());
                    let _ = tx.send(Completion { ticket, outcome });
                });
            }
        }
        ticket
    }

    pub fn try_next(&mut self) -> Option<Completion> {
        match self.rx.try_recv() {
            Ok(completion) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(completion)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            // The worker keeps its own sender, so the channel cannot disconnect.
            Err(mpsc::TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until the next completion arrives or `timeout` passes.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<Completion> {
        if self.in_flight == 0 {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(completion)
            }
            Err(_) => None,
        }
    }
}

impl std::fmt::Debug for RequestWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestWorker")
            .field("dispatch", &self.dispatch)
            .field("next_sequence", &self.next_sequence)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{ApiCall, MockApi};

    #[test]
    fn inline_dispatch_queues_completion_with_ticket() {
        let api = Arc::new(MockApi::new());
        let mut worker = RequestWorker::new(api.clone(), Dispatch::Inline);

        let ticket = worker.dispatch(Some(ToolKind::ClearAll), 7, ApiRequest::Count);
        assert_eq!(worker.in_flight(), 1);

        let completion = worker.try_next().unwrap();
        assert_eq!(completion.ticket, ticket);
        assert_eq!(completion.ticket.generation, 7);
        assert!(matches!(
            completion.outcome,
            ApiCompletion::Counted { result: Ok(0) }
        ));
        assert_eq!(worker.in_flight(), 0);
        assert!(worker.try_next().is_none());
        assert_eq!(api.calls(), vec![ApiCall::Count]);
    }

    #[test]
    fn background_dispatch_delivers_completion() {
        let api = Arc::new(MockApi::new());
        let mut worker = RequestWorker::new(api, Dispatch::Background);

        let first = worker.dispatch(None, 0, ApiRequest::Count);
        let second = worker.dispatch(None, 0, ApiRequest::DeleteAll);
        assert!(second.sequence > first.sequence);

        let mut sequences = Vec::new();
        while let Some(completion) = worker.wait_next(Duration::from_secs(5)) {
            sequences.push(completion.ticket.sequence);
        }
        sequences.sort_unstable();
        assert_eq!(sequences, vec![first.sequence, second.sequence]);
    }
}
