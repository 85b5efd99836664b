//! Turnstile: a declarative finite state machine engine.
//!
//! A [`Machine`] is an immutable blueprint built from a table of named
//! transitions and a set of lifecycle callbacks. Any number of independent
//! [`Instance`]s can be stamped out of one machine and driven concurrently;
//! each instance is internally synchronized and tracks only its own runtime
//! state.
//!
//! # Core concepts
//!
//! - **Transitions**: an event name plus legal source states and one
//!   destination, declared with [`TransitionDesc`] or the builder
//! - **Callbacks**: hooks fired around each transition in a fixed order:
//!   `before` (cancelable), `leave` (cancelable or deferrable), `enter`,
//!   then `after`, with targeted hooks always running before generic ones
//! - **Deferred completion**: a leave hook can park a transition; a later
//!   call to [`Instance::complete_deferred_transition`], from any thread,
//!   performs the swap and fires the remaining hooks
//!
//! # Example
//!
//! ```rust
//! use turnstile::{callback, Machine};
//!
//! let machine = Machine::builder()
//!     .transition("open", ["closed"], "open")
//!     .transition("close", ["open"], "closed")
//!     .on_enter("open", callback(|_, _| println!("door is open")))
//!     .build()
//!     .unwrap();
//!
//! let door = machine.new_instance("closed");
//! door.transition(&machine, "open", Vec::new()).unwrap();
//! assert!(door.is("open"));
//! assert_eq!(door.available_transitions(&machine), vec!["close".to_string()]);
//! ```

pub mod builder;
pub mod error;
pub mod history;
pub mod instance;
pub mod machine;
pub mod visualize;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use error::{BoxError, TransitionError};
pub use history::{TransitionLog, TransitionRecord};
pub use instance::{metadata_value, Instance, MetadataValue, TransitionContext};
pub use machine::{callback, Callback, CallbackKind, Machine, TransitionDesc};
pub use visualize::{
    mermaid_flowchart, mermaid_state_diagram, visualize, visualize_with_format, VisualizeFormat,
};
