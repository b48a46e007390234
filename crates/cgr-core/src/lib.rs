//! # CGR Core
//!
//! Data model for contact graph routing in delay-tolerant networks.
//!
//! A [`ContactPlan`] owns every scheduled [`Contact`]; routing code refers to
//! contacts by [`ContactId`] and materializes paths as [`Route`]s, which carry
//! their own hop snapshots and aggregate metrics. A [`Bundle`] describes a
//! single routing request.
//!
//! ## Example
//!
//! ```rust
//! use cgr_core::{Contact, ContactPlan, ContactId, Route};
//!
//! let plan = ContactPlan::from_contacts([
//!     Contact::new(1, 2, 0, 100, 10).with_owlt(1),
//!     Contact::new(2, 3, 10, 100, 10).with_owlt(1),
//! ])?;
//!
//! let route = Route::from_hops(&plan, &[ContactId(0), ContactId(1)]);
//! assert_eq!(route.next_node(), 2);
//! assert_eq!(route.best_delivery_time(), 11);
//! # Ok::<(), cgr_core::PlanError>(())
//! ```

pub mod bundle;
pub mod contact;
pub mod error;
pub mod plan;
pub mod route;

pub use bundle::{Bundle, EVC_FLOOR, EVC_OVERHEAD_FACTOR};
pub use contact::{
    Contact, ContactId, INFINITE_TIME, NodeId, PRIORITY_TIERS, Priority, Time, Volume,
};
pub use error::{PlanError, PlanResult};
pub use plan::ContactPlan;
pub use route::{Route, RouteHop};
