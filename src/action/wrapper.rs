use super::token::Token;
use crate::error::{Result, StoreError};
use crate::plugin::HookDispatch;
use crate::store::State;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

/// What an action body reports: its value, or the reason it failed.
pub type ActionResult = anyhow::Result<Value>;

/// Result of invoking an action body.
pub enum ActionOutput {
    /// The action completed during the call.
    Immediate(ActionResult),
    /// The action is still running; its result arrives later.
    Pending(BoxFuture<'static, ActionResult>),
}

impl ActionOutput {
    pub fn is_pending(&self) -> bool {
        matches!(self, ActionOutput::Pending(_))
    }
}

impl From<ActionResult> for ActionOutput {
    fn from(result: ActionResult) -> Self {
        ActionOutput::Immediate(result)
    }
}

impl fmt::Debug for ActionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutput::Immediate(result) => f.debug_tuple("Immediate").field(result).finish(),
            ActionOutput::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

type ActionBody = Arc<dyn Fn(&State, Vec<Value>) -> ActionOutput + Send + Sync>;

/// An action as declared in a store description.
///
/// The body receives the state of the store it is declared on and the
/// call arguments.
#[derive(Clone)]
pub struct Action {
    body: ActionBody,
}

impl Action {
    /// An action deciding per call whether it completes immediately.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&State, Vec<Value>) -> ActionOutput + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
        }
    }

    /// An action that always completes during the call.
    pub fn sync<F>(body: F) -> Self
    where
        F: Fn(&State, Vec<Value>) -> ActionResult + Send + Sync + 'static,
    {
        Self::new(move |state, args| ActionOutput::Immediate(body(state, args)))
    }

    /// An action returning a future.
    ///
    /// ```
    /// use hookstore::{Action, State};
    /// use serde_json::json;
    ///
    /// let load = Action::future(|state: &State, _args| {
    ///     let state = state.clone();
    ///     async move {
    ///         state.set("loaded", json!(true))?;
    ///         Ok(json!("done"))
    ///     }
    /// });
    /// # let _ = load;
    /// ```
    pub fn future<F, Fut>(body: F) -> Self
    where
        F: Fn(&State, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        Self::new(move |state, args| ActionOutput::Pending(body(state, args).boxed()))
    }

    pub fn invoke(&self, state: &State, args: Vec<Value>) -> ActionOutput {
        (self.body)(state, args)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}

/// Future returned by a wrapped action call.
pub type ActionCall = BoxFuture<'static, Result<Value>>;

/// An action instrumented with `before` / `after` hooks.
#[derive(Clone)]
pub struct WrappedAction {
    inner: Arc<WrappedInner>,
}

struct WrappedInner {
    name: String,
    action: Action,
    state: State,
    hooks: HookDispatch,
}

impl WrappedAction {
    pub(crate) fn new(name: String, action: Action, state: State, hooks: HookDispatch) -> Self {
        Self {
            inner: Arc::new(WrappedInner {
                name,
                action,
                state,
                hooks,
            }),
        }
    }

    /// Qualified name, `"<store>.actions.<key>"`.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Call the action.
    ///
    /// A fresh [`Token`] is drawn and the `before` hooks run before the
    /// body, during this call. The returned future waits for the body's
    /// pending result (if any) and for one flush of the reactive runtime,
    /// then runs the `after` hooks with the same token and yields the
    /// body's value. A failed body is reported as
    /// [`StoreError::ActionFailed`], after the `after` hooks ran.
    ///
    /// The `after` phase belongs to the returned future: drop it unpolled
    /// and the `after` hooks never run.
    pub fn call(&self, args: Vec<Value>) -> ActionCall {
        let inner = Arc::clone(&self.inner);
        let token = Token::generate();
        let root = inner.hooks.root();

        if let Some(root) = &root {
            inner.hooks.action_before(root, &inner.name, &token);
        }
        let output = inner.action.invoke(&inner.state, args);
        trace!(action = %inner.name, %token, pending = output.is_pending(), "Action invoked");

        async move {
            let result = match output {
                ActionOutput::Immediate(result) => result,
                ActionOutput::Pending(pending) => pending.await,
            };
            inner.state.runtime().next_tick().await;

            if let Some(root) = &root {
                inner.hooks.action_after(root, &inner.name, &token);
            }
            result.map_err(|source| StoreError::ActionFailed {
                action: inner.name.clone(),
                source,
            })
        }
        .boxed()
    }
}

impl fmt::Debug for WrappedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedAction")
            .field("name", &self.inner.name)
            .finish()
    }
}
