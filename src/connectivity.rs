//! Checks that the OSM API is reachable before a network import starts.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc,
    },
    thread,
    time::Duration,
};

use log::{info, warn};

use crate::fetch::Transport;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectivityOutcome {
    Success,
    Failure(String),
}

fn failure_message(url: &str) -> String {
    format!(
        "Unable to read data from {}: check your internet connection and proxy settings \
         and try again.",
        url
    )
}

fn check(transport: &dyn Transport, url: &str) -> ConnectivityOutcome {
    match transport.get(url, &[]) {
        Ok(response) if response.is_ok() && !response.body.is_empty() => {
            ConnectivityOutcome::Success
        }
        Ok(response) => {
            warn!(url = url, status = response.status; "Connection check got an unusable answer");
            ConnectivityOutcome::Failure(failure_message(url))
        }
        Err(err) => {
            warn!(url = url, err = err.to_string().as_str(); "Connection check failed");
            ConnectivityOutcome::Failure(failure_message(url))
        }
    }
}

/// Cancels a running check from any thread, including while another thread
/// is blocked in [`ConnectionChecker::wait`].
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs one GET against `url` on a worker thread. Cancelling counts as
/// success, so the host can skip the check without blocking on it.
pub struct ConnectionChecker {
    cancelled: CancelHandle,
    outcome: Receiver<ConnectivityOutcome>,
}

impl ConnectionChecker {
    pub fn spawn(transport: Arc<dyn Transport>, url: impl Into<String>) -> Self {
        let url = url.into();
        let cancelled = CancelHandle(Arc::new(AtomicBool::new(false)));
        let (sender, outcome) = mpsc::channel();

        thread::spawn(move || {
            info!(url = url.as_str(); "Checking network connection");
            // The receiver is gone when the host stopped waiting.
            let _ = sender.send(check(transport.as_ref(), &url));
        });

        ConnectionChecker { cancelled, outcome }
    }

    pub fn cancel(&self) {
        self.cancelled.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancelled.clone()
    }

    /// Blocks until the check finishes or is cancelled. A cancel through a
    /// [`CancelHandle`] is noticed within one poll interval.
    pub fn wait(self) -> ConnectivityOutcome {
        loop {
            if self.cancelled.is_cancelled() {
                return ConnectivityOutcome::Success;
            }
            match self.outcome.recv_timeout(POLL_INTERVAL) {
                Ok(_) if self.cancelled.is_cancelled() => return ConnectivityOutcome::Success,
                Ok(outcome) => return outcome,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    let message = "connection check stopped unexpectedly".to_string();
                    return ConnectivityOutcome::Failure(message);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Instant};

    use super::*;
    use crate::{
        errors::FetchError,
        fetch::{tests::ScriptedTransport, HttpResponse},
    };

    #[test]
    fn reachable_url_succeeds() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok("<osm/>")]));
        let outcome = ConnectionChecker::spawn(transport.clone(), "http://osm.test").wait();
        assert_eq!(outcome, ConnectivityOutcome::Success);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn transport_error_and_bad_status_fail() {
        let refused = Err(FetchError::Unavailable("refused".into()));
        let transport = Arc::new(ScriptedTransport::new(vec![refused]));
        match ConnectionChecker::spawn(transport, "http://osm.test").wait() {
            ConnectivityOutcome::Failure(message) => assert!(message.contains("http://osm.test")),
            other => panic!("unexpected outcome {:?}", other),
        }

        let transport = Arc::new(ScriptedTransport::new(vec![Ok(HttpResponse {
            status: 503,
            body: b"busy".to_vec(),
        })]));
        assert!(matches!(
            ConnectionChecker::spawn(transport, "http://osm.test").wait(),
            ConnectivityOutcome::Failure(_)
        ));
    }

    /// Never answers until the test releases it.
    struct StalledTransport {
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Transport for StalledTransport {
        fn get(&self, _url: &str, _query: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
            let _ = self.release.lock().unwrap().recv();
            Err(FetchError::Unavailable("released".into()))
        }
    }

    #[test]
    fn cancelled_check_counts_as_success() {
        let (release, receiver) = mpsc::channel();
        let transport = Arc::new(StalledTransport {
            release: Mutex::new(receiver),
        });

        let checker = ConnectionChecker::spawn(transport, "http://osm.test");
        checker.cancel();
        assert_eq!(checker.wait(), ConnectivityOutcome::Success);
        release.send(()).unwrap();
    }

    #[test]
    fn cancel_during_wait_unblocks_the_host() {
        let (release, receiver) = mpsc::channel();
        let transport = Arc::new(StalledTransport {
            release: Mutex::new(receiver),
        });

        let checker = ConnectionChecker::spawn(transport, "http://osm.test");
        let handle = checker.cancel_handle();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            handle.cancel();
        });

        let started = Instant::now();
        assert_eq!(checker.wait(), ConnectivityOutcome::Success);
        assert!(started.elapsed() < Duration::from_secs(5));

        canceller.join().unwrap();
        release.send(()).unwrap();
    }
}
