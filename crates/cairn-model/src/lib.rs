//! Block-graph model for the Cairn editor.
//!
//! The [`Workspace`] owns every block in an arena and is the only way to
//! change the graph: creating and disposing blocks, connecting and
//! disconnecting them, editing fields, and applying mutations all go
//! through it so connection symmetry and shadow lifecycles hold at every
//! step. Block kinds are described once in a [`Registry`] and instantiated
//! by name.
//!
//! ```
//! use std::rc::Rc;
//! use cairn_model::{catalog, PortRef, Workspace};
//!
//! let mut ws = Workspace::new(Rc::new(catalog::standard()));
//! let hat = ws.create_block("event_when_started")?;
//! let say = ws.create_block("looks_say")?;
//! ws.connect(PortRef::next(hat), PortRef::previous(say))?;
//! # Ok::<(), cairn_model::ModelError>(())
//! ```

pub mod block;
pub mod catalog;
pub mod connection;
pub mod error;
pub mod event;
pub mod input;
pub mod mutation;
pub mod registry;
pub mod serialize;
pub mod workspace;

pub use block::{Block, BlockId, HatKind, OutputShape};
pub use connection::{Connection, ConnectionKind, Port, PortRef};
pub use error::ModelError;
pub use event::{ChangeEvent, EventLog, Recorded};
pub use input::{Field, FieldKind, Input, InputKind};
pub use mutation::{Mutation, MutationForm, Param};
pub use registry::{BlockBehavior, BlockDescriptor, InputSpec, Registry};
pub use serialize::{IdPolicy, SerializedBlock, SerializedInput};
pub use workspace::{ProcedureUpdate, Workspace};
