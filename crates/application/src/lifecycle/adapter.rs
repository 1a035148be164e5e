use std::collections::{HashMap, VecDeque};

use domain::{
    ActivityResult, BridgeError, CaptureRequest, CaptureTarget, ContextId, Disposition,
    HostContext,
};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::pending::PendingScan;

/// What happened to an activity-result notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The pending slot was completed
    Delivered,
    /// Held until the context is reattached after a reconfigure
    Deferred,
    /// Not one of ours
    Ignored,
}

struct PendingEntry {
    context: ContextId,
    target: CaptureTarget,
    slot: oneshot::Sender<Result<String, BridgeError>>,
}

/// Request codes remembered after their context is torn down
const ABANDONED_HISTORY: usize = 64;

/// Tracks the host's foreground context and the foreground-capture requests
/// issued against it.
///
/// A reconfigure (`detach_for_config_changes` then `reattach`) carries pending
/// requests over to the new context. A full `detach` abandons them: their
/// waiters resolve to `ContextGone`, and so does a later result for one of them.
pub struct LifecycleAdapter {
    current: Option<HostContext>,
    reconfiguring: Option<ContextId>,
    next_context: u64,
    next_request_code: i32,
    pending: HashMap<i32, PendingEntry>,
    abandoned: VecDeque<i32>,
    deferred: Vec<ActivityResult>,
}

impl LifecycleAdapter {
    pub fn new(request_code_base: i32) -> Self {
        Self {
            current: None,
            reconfiguring: None,
            next_context: 1,
            next_request_code: request_code_base,
            pending: HashMap::new(),
            abandoned: VecDeque::new(),
            deferred: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&HostContext> {
        self.current.as_ref()
    }

    pub fn is_reconfiguring(&self) -> bool {
        self.reconfiguring.is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `request_code` can still complete
    pub fn is_live(&self, request_code: i32) -> bool {
        self.pending.contains_key(&request_code)
    }

    pub fn attach(&mut self, name: &str) -> HostContext {
        if self.reconfiguring.is_some() {
            return self.reattach(name);
        }

        let context = self.new_context(name);
        if let Some(previous) = self.current.replace(context.clone()) {
            self.abandon_context(previous.id);
        }
        info!(context = %context.id, name = %context.name, "Host context attached");
        context
    }

    pub fn detach_for_config_changes(&mut self) {
        if let Some(context) = self.current.take() {
            debug!(context = %context.id, "Host context detached for reconfigure");
            self.reconfiguring = Some(context.id);
        }
    }

    pub fn reattach(&mut self, name: &str) -> HostContext {
        let context = self.new_context(name);
        let previous = self
            .reconfiguring
            .take()
            .or_else(|| self.current.as_ref().map(|c| c.id));

        if let Some(previous) = previous {
            let mut migrated = 0;
            for entry in self.pending.values_mut() {
                if entry.context == previous {
                    entry.context = context.id;
                    migrated += 1;
                }
            }
            debug!(from = %previous, to = %context.id, migrated, "Pending requests carried over");
        }

        self.current = Some(context.clone());
        info!(context = %context.id, name = %context.name, "Host context reattached");

        for result in std::mem::take(&mut self.deferred) {
            if let Err(e) = self.complete(result) {
                warn!(error = %e, "Deferred capture result could not be delivered");
            }
        }
        context
    }

    /// Tear down the current context. Returns the request codes abandoned.
    pub fn detach(&mut self) -> Vec<i32> {
        let mut abandoned = Vec::new();
        if let Some(context) = self.current.take() {
            abandoned.extend(self.abandon_context(context.id));
        }
        if let Some(context) = self.reconfiguring.take() {
            abandoned.extend(self.abandon_context(context));
        }

        // Results held across a reconfigure now belong to a dead context
        self.deferred.clear();

        info!(abandoned = abandoned.len(), "Host context detached");
        abandoned
    }

    /// Issue a new request against the current context
    pub fn register(
        &mut self,
        target: CaptureTarget,
    ) -> Result<(CaptureRequest, PendingScan), BridgeError> {
        let context = self.current.clone().ok_or(BridgeError::ContextGone)?;

        let request_code = self.next_request_code;
        self.next_request_code = self.next_request_code.wrapping_add(1);

        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            request_code,
            PendingEntry {
                context: context.id,
                target,
                slot: tx,
            },
        );
        debug!(request_code, ?target, context = %context.id, "Capture request registered");

        Ok((
            CaptureRequest {
                request_code,
                target,
                context,
            },
            PendingScan::new(request_code, rx),
        ))
    }

    /// Route an activity-result notification to its pending slot
    pub fn complete(&mut self, result: ActivityResult) -> Result<Completion, BridgeError> {
        let request_code = result.request_code;
        let Some(entry) = self.pending.remove(&request_code) else {
            if self.abandoned.contains(&request_code) {
                warn!(request_code, "Result arrived for a torn-down context");
                return Err(BridgeError::ContextGone);
            }
            debug!(request_code, "Ignoring result for unknown request");
            return Ok(Completion::Ignored);
        };

        let Some(current) = self.current.as_ref().map(|c| c.id) else {
            if self.reconfiguring == Some(entry.context) {
                debug!(request_code, "Deferring result until the context is reattached");
                self.pending.insert(request_code, entry);
                self.deferred.push(result);
                return Ok(Completion::Deferred);
            }
            return Err(BridgeError::ContextGone);
        };

        if current != entry.context {
            warn!(request_code, expected = %entry.context, %current, "Result for a stale context");
            return Err(BridgeError::ContextGone);
        }

        let outcome = match (result.disposition, result.payload) {
            (Disposition::Ok, Some(payload)) => Ok(payload),
            _ => Err(BridgeError::ScanFailed),
        };
        info!(request_code, target = ?entry.target, ok = outcome.is_ok(), "Capture result delivered");

        // The caller may have stopped waiting
        let _ = entry.slot.send(outcome);
        Ok(Completion::Delivered)
    }

    /// Complete one live request with `ScanCancelled`
    pub fn cancel(&mut self, request_code: i32) -> bool {
        match self.pending.remove(&request_code) {
            Some(entry) => {
                let _ = entry.slot.send(Err(BridgeError::ScanCancelled));
                debug!(request_code, "Capture request cancelled");
                true
            }
            None => false,
        }
    }

    /// Drop a request that never reached the capture mechanism
    pub fn forget(&mut self, request_code: i32) {
        self.pending.remove(&request_code);
    }

    /// Cancel every pending request. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        self.deferred.clear();
        let cancelled = self.pending.len();
        for (_, entry) in self.pending.drain() {
            let _ = entry.slot.send(Err(BridgeError::ScanCancelled));
        }
        if cancelled > 0 {
            info!(cancelled, "Pending capture requests cancelled");
        }
        cancelled
    }

    fn new_context(&mut self, name: &str) -> HostContext {
        let id = ContextId(self.next_context);
        self.next_context += 1;
        HostContext::new(id, name)
    }

    /// Drop every request issued against `context`. Only the codes are kept,
    /// so a late result can still be told apart from an unknown one.
    fn abandon_context(&mut self, context: ContextId) -> Vec<i32> {
        let codes: Vec<i32> = self
            .pending
            .iter()
            .filter(|(_, e)| e.context == context)
            .map(|(code, _)| *code)
            .collect();

        for code in &codes {
            self.pending.remove(code);
            if self.abandoned.len() == ABANDONED_HISTORY {
                self.abandoned.pop_front();
            }
            self.abandoned.push_back(*code);
        }
        codes
    }
}
