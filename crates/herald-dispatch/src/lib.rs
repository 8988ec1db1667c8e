//! Action authorization and dispatch for Herald.
//!
//! Action nodes are registered in a [`Registry`]; a [`Dispatcher`] takes
//! inbound [`Invocation`]s, resolves them to a node, runs the owner,
//! category, origin and cooldown gates, and invokes the node's handler.
//! Outcomes are reported to an optional [`Observer`].

pub mod capability;
pub mod category;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod handler;
pub mod invocation;
pub mod node;
pub mod observer;
pub mod policy;
pub mod registry;
pub mod sweeper;

pub use capability::{Capability, CapabilitySet};
pub use category::Category;
pub use cooldown::{CooldownKey, CooldownScope, CooldownStore, MAX_COOLDOWN_SECS};
pub use engine::{Dispatch, Dispatcher, Gate, Refusal, Step};
pub use error::{CapabilityDenied, DispatchError, HandlerFault, HandlerPanic, RegistryError};
pub use handler::{handler_fn, noop, CommandContext, Handler, NoopHandler};
pub use invocation::{parse_prefixed, split_head, Arguments, ContextTarget, Invocation};
pub use node::{AccessLevel, ActionKind, ActionNode, ActionNodeBuilder};
pub use observer::{Observer, Outcome, OutcomeStatus, TracingObserver};
pub use policy::{AllowAll, PolicyProvider, Responder, SilentResponder, Subject};
pub use registry::{ClientSettings, Registry};
pub use sweeper::CooldownSweeper;
