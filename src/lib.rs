//! Role based access control for actix-web actions.
//!
//! Actions declare what they require as annotations: a permission tag checked
//! against a [`grant::GrantRelation`], or a role tag compared with the caller's
//! roles. Both accept a bare value (`write`) applying to every method, or
//! values keyed by method (`GET:"read" POST:"write"`). The caller's roles are
//! read from a [`session::SessionStore`].
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.register::<EditPost>();
//! let rbac = Rbac::new(grants, sessions, Arc::new(registry), Options::new());
//!
//! App::new()
//!     .app_data(Data::new(rbac))
//!     .route("/posts/{id}", rbac_gate::dispatch::route::<EditPost>())
//! ```

pub mod action;
pub mod annotation;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod grant;
pub mod logs;
pub mod resolver;
pub mod session;
pub mod tag;

pub use action::{Action, ActionId, BoundAction, Capabilities};
pub use annotation::{Annotations, Registry};
pub use config::{Options, RbacConfig};
pub use engine::{Decision, Rbac};
