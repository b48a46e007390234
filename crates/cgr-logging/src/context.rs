//! Node context for multi-router logging
//!
//! Several routers often run in one process (simulations, tests). This
//! module keeps the local node id of the router currently doing work in
//! thread-local storage so spans opened in that scope can be tagged with it.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use cgr_core::NodeId;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Node context stored in thread-local storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContextData {
    /// Local node id of the active router
    pub node_id: NodeId,
    /// Process-unique id of this router session
    pub instance: u64,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Creating the guard sets the node context for the current thread; dropping
/// it restores whatever context was active before.
///
/// # Example
///
/// ```
/// use cgr_logging::NodeContextGuard;
///
/// {
///     let _guard = NodeContextGuard::new(7);
///     assert_eq!(NodeContextGuard::current_node_id(), Some(7));
///     tracing::info!("Computing routes");
/// }
/// assert!(NodeContextGuard::current().is_none());
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Set `node_id` as the context with a fresh instance id
    pub fn new(node_id: NodeId) -> Self {
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        Self::with_instance(node_id, instance)
    }

    /// Set `node_id` as the context with a caller-chosen instance id
    ///
    /// Useful to keep one instance id across a router restart.
    pub fn with_instance(node_id: NodeId, instance: u64) -> Self {
        let data = NodeContextData { node_id, instance };
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow_mut().replace(data));
        Self { previous }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| *ctx.borrow())
    }

    pub fn current_node_id() -> Option<NodeId> {
        Self::current().map(|ctx| ctx.node_id)
    }

    pub fn current_instance() -> Option<u64> {
        Self::current().map(|ctx| ctx.instance)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block with a node context set
///
/// # Example
///
/// ```
/// use cgr_logging::{NodeContextGuard, with_node_context};
///
/// let node = with_node_context!(3, { NodeContextGuard::current_node_id() });
/// assert_eq!(node, Some(3));
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($node_id:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($node_id);
        $body
    }};
}
