//! In-process exchange double for control tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use armbridge_core::command::Command;
use armbridge_core::error::{ExchangeError, Result};
use armbridge_core::exchange::Exchange;
use armbridge_core::observation::Observation;
use async_trait::async_trait;

/// Records every command and replies with an observation echoing its axes.
pub(crate) struct ScriptedExchange {
    sent: Mutex<Vec<Command>>,
    failures: Mutex<Vec<(usize, ExchangeError)>>,
    calls: AtomicUsize,
    peers: AtomicUsize,
}

impl ScriptedExchange {
    pub(crate) fn connected() -> Self {
        Self::with_peers(1)
    }

    pub(crate) fn with_peers(peers: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            peers: AtomicUsize::new(peers),
        }
    }

    pub(crate) fn set_peers(&self, peers: usize) {
        self.peers.store(peers, Ordering::SeqCst);
    }

    /// Fail the next exchange with `error`.
    pub(crate) fn fail_next(&self, error: ExchangeError) {
        self.fail_on_call(self.calls.load(Ordering::SeqCst), error);
    }

    /// Fail the exchange with zero-based index `call`.
    pub(crate) fn fail_on_call(&self, call: usize, error: ExchangeError) {
        self.failures.lock().unwrap().push((call, error));
    }

    pub(crate) fn sent(&self) -> Vec<Command> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn send_and_await(&self, command: &Command) -> Result<Observation> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(i) = failures.iter().position(|(at, _)| *at == call) {
                return Err(failures.remove(i).1.into());
            }
        }
        self.sent.lock().unwrap().push(command.clone());
        Ok(Observation::new(
            vec![0.0; 3],
            vec![1.0; 3],
            command.axes().to_vec(),
        ))
    }

    fn peer_count(&self) -> usize {
        self.peers.load(Ordering::SeqCst)
    }
}
