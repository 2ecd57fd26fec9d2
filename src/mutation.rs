//! One-shot mutation handle for view code.
//!
//! A `Mutation<T>` wraps one mutation instance's lifecycle:
//! idle -> submitting -> {succeeded, failed}, terminal in both end states.
//! There are no internal retries; re-running a failed mutation means
//! constructing a new instance, which keeps duplicate side effects on the
//! remote service an explicit caller decision.
//!
//! # Example
//!
//! ```ignore
//! let client = client.clone();
//! let mut rename = Mutation::new(move || {
//!     let client = client.clone();
//!     async move { client.rename_document("sales.csv", "sales2.csv").await }
//! });
//!
//! rename.submit();
//!
//! // In the event loop tick
//! if rename.poll() {
//!     // State changed, re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::oneshot;

use crate::error::ApiError;

/// The state of a mutation instance.
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  /// Not submitted yet.
  Idle,
  /// Request in flight.
  Submitting,
  /// Terminal: the server accepted the mutation.
  Succeeded(T),
  /// Terminal: the mutation failed; nothing was invalidated.
  Failed(ApiError),
}

impl<T> MutationState<T> {
  pub fn is_idle(&self) -> bool {
    matches!(self, MutationState::Idle)
  }

  pub fn is_submitting(&self) -> bool {
    matches!(self, MutationState::Submitting)
  }

  pub fn is_succeeded(&self) -> bool {
    matches!(self, MutationState::Succeeded(_))
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, MutationState::Failed(_))
  }

  pub fn result(&self) -> Option<&T> {
    match self {
      MutationState::Succeeded(value) => Some(value),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      MutationState::Failed(err) => Some(err),
      _ => None,
    }
  }
}

type BoxSubmit<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;
type SubmitFn<T> = Box<dyn FnOnce() -> BoxSubmit<T> + Send>;

/// Poll-based handle around a single mutation submission.
pub struct Mutation<T> {
  state: MutationState<T>,
  submit: Option<SubmitFn<T>>,
  receiver: Option<oneshot::Receiver<Result<T, ApiError>>>,
}

impl<T: Send + 'static> Mutation<T> {
  /// Create a handle around a submission closure, typically capturing a
  /// cloned [`crate::Client`] and calling `perform` or a typed wrapper.
  pub fn new<F, Fut>(submit: F) -> Self
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      state: MutationState::Idle,
      submit: Some(Box::new(move || Box::pin(submit()))),
      receiver: None,
    }
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  /// Submit once. Calls while submitting or after a terminal state are
  /// no-ops.
  pub fn submit(&mut self) {
    if !self.state.is_idle() {
      return;
    }
    let Some(factory) = self.submit.take() else {
      return;
    };

    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    self.state = MutationState::Submitting;

    let future = factory();
    tokio::spawn(async move {
      // Ignore send errors - the handle may have been dropped
      let _ = tx.send(future.await);
    });
  }

  /// Poll for the outcome of a pending submission.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        self.state = MutationState::Succeeded(value);
        self.receiver = None;
        true
      }
      Ok(Err(err)) => {
        self.state = MutationState::Failed(err);
        self.receiver = None;
        true
      }
      Err(oneshot::error::TryRecvError::Empty) => false,
      Err(oneshot::error::TryRecvError::Closed) => {
        // Sender dropped without sending - treat as failure
        self.state = MutationState::Failed(ApiError::Transport(
          "mutation task dropped before completing".into(),
        ));
        self.receiver = None;
        true
      }
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Mutation<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_mutation_success() {
    let mut mutation = Mutation::new(|| async { Ok::<_, ApiError>(42) });

    assert!(mutation.state().is_idle());
    mutation.submit();
    assert!(mutation.state().is_submitting());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(mutation.poll());
    assert!(mutation.state().is_succeeded());
    assert_eq!(mutation.state().result(), Some(&42));
  }

  #[tokio::test]
  async fn test_mutation_failure() {
    let mut mutation: Mutation<i32> = Mutation::new(|| async {
      Err(ApiError::Rejected { status: 422, message: "bad input".into() })
    });

    mutation.submit();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(mutation.poll());
    assert!(mutation.state().is_failed());
    assert_eq!(
      mutation.state().error(),
      Some(&ApiError::Rejected { status: 422, message: "bad input".into() })
    );
  }

  #[tokio::test]
  async fn test_submit_while_submitting_is_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let mut mutation = Mutation::new(move || {
      let counter = Arc::clone(&counter);
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, ApiError>(())
      }
    });

    mutation.submit();
    mutation.submit();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_terminal_state_is_final() {
    let mut mutation = Mutation::new(|| async { Ok::<_, ApiError>(1) });

    mutation.submit();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());

    mutation.submit();
    assert!(mutation.state().is_succeeded());
    assert!(!mutation.poll());
  }
}
