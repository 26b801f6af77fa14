//! Optimistic-then-reconcile mutations.
//!
//! An optimistic write is staged against the shared state, capturing what is
//! needed to undo it, and published before its request is sent. Once the
//! response arrives the write is settled or reverted under the lock. A
//! response whose intent has since been superseded is discarded without
//! touching the state, although a failure it carries is still reported.

use super::store::BoardState;
use super::{BoardStore, BoardSyncResult};
use crate::board::ports::{GatewayError, GatewayResult};
use std::future::Future;
use std::time::Duration;

/// One optimistic write.
pub(crate) trait OptimisticMutation {
    /// Data captured while staging, available to the later steps.
    type Staged;
    /// Successful server response.
    type Response;
    /// Value produced when the response settles the write.
    type Output;

    /// Validates and applies the change locally.
    fn stage(&self, state: &mut BoardState) -> BoardSyncResult<Self::Staged>;

    /// Returns `false` when a newer intent owns the outcome.
    fn is_current(&self, state: &BoardState, staged: &Self::Staged) -> bool;

    /// Absorbs the server's confirmation.
    fn settle(
        &self,
        state: &mut BoardState,
        staged: &Self::Staged,
        response: Self::Response,
    ) -> Self::Output;

    /// Repairs the state after the request failed.
    fn revert(
        &self,
        state: &mut BoardState,
        staged: &Self::Staged,
        error: &GatewayError,
    );

    /// Accounts for a response dropped because a newer intent owns the
    /// outcome. `failure` is the server's error when the response was one.
    fn discard(
        &self,
        _state: &mut BoardState,
        _staged: &Self::Staged,
        _failure: Option<&GatewayError>,
    ) {
    }
}

/// Final state of a reconciled mutation.
#[derive(Debug)]
pub(crate) enum Reconciled<T> {
    /// The server confirmed the write.
    Settled(T),
    /// The server refused or never answered; the mutation reverted.
    Reverted(GatewayError),
    /// A newer intent superseded this write; the response was dropped.
    ///
    /// Carries the server's failure when the dropped response was one.
    Discarded(Option<GatewayError>),
}

/// A mutation applied locally and awaiting confirmation.
pub(crate) struct Pending<M: OptimisticMutation> {
    store: BoardStore,
    mutation: M,
    staged: M::Staged,
}

impl<M: OptimisticMutation> Pending<M> {
    /// Applies the mutation to the shared state and publishes the change.
    pub(crate) fn apply(store: &BoardStore, mutation: M) -> BoardSyncResult<Self> {
        let staged = store.mutate(|state| mutation.stage(state))?;
        Ok(Self {
            store: store.clone(),
            mutation,
            staged,
        })
    }

    /// Data captured while staging.
    pub(crate) const fn staged(&self) -> &M::Staged {
        &self.staged
    }

    /// Awaits the confirming request and settles or reverts on its outcome.
    ///
    /// The state lock is not held while `request` is pending.
    pub(crate) async fn confirm(
        self,
        timeout: Duration,
        request: impl Future<Output = GatewayResult<M::Response>>,
    ) -> BoardSyncResult<Reconciled<M::Output>> {
        let response = within(timeout, request).await;
        let Self {
            store,
            mutation,
            staged,
        } = self;
        store.mutate(|state| {
            if !mutation.is_current(state, &staged) {
                let failure = response.err();
                mutation.discard(state, &staged, failure.as_ref());
                return Ok(Reconciled::Discarded(failure));
            }
            Ok(match response {
                Ok(body) => Reconciled::Settled(mutation.settle(state, &staged, body)),
                Err(err) => {
                    mutation.revert(state, &staged, &err);
                    Reconciled::Reverted(err)
                }
            })
        })
    }
}

/// Awaits a gateway call, failing it with [`GatewayError::Timeout`] once the
/// timeout elapses.
pub(crate) async fn within<T>(
    timeout: Duration,
    request: impl Future<Output = GatewayResult<T>>,
) -> GatewayResult<T> {
    tokio::time::timeout(timeout, request)
        .await
        .unwrap_or(Err(GatewayError::Timeout))
}
