//! Graph node wrapping one job.
//!
//! A [`TaskNode`] tracks its successors and predecessors, enumerates the
//! root-to-leaf paths below it and dispatches each path as its own concurrent
//! unit. Every node loads its job at most once, however many paths reach it.

use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::FutureExt;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::context::LoadContext;
use super::job::Job;
use super::path::{self, NodePath};
use super::waiter::{panic_message, Waiter};
use crate::core::config::LoaderConfig;
use crate::core::errors::{LoaderError, Result};

/// Shared handle to a node. Identity is the allocation, never the job name.
pub type NodeRef = Arc<TaskNode>;

/// Name reported by a node without a job
pub const UNKNOWN_NAME: &str = "unknown";

#[derive(Default)]
struct NodeState {
    job: Option<Arc<dyn Job>>,
    sub_nodes: Vec<NodeRef>,
    sub_set: HashSet<usize>,
    pre_nodes: Vec<Weak<TaskNode>>,
    pre_set: HashSet<usize>,
    is_load: bool,
}

pub struct TaskNode {
    state: Mutex<NodeState>,
    load_once: OnceCell<()>,
    path_once: OnceCell<()>,
    waiter: Waiter,
    config: Arc<LoaderConfig>,
}

impl TaskNode {
    pub fn new(job: Arc<dyn Job>) -> NodeRef {
        Self::with_config(Some(job), Arc::new(LoaderConfig::default()))
    }

    /// A node without a job; set one later with [`TaskNode::set_job`]
    pub fn empty() -> NodeRef {
        Self::with_config(None, Arc::new(LoaderConfig::default()))
    }

    pub fn with_config(job: Option<Arc<dyn Job>>, config: Arc<LoaderConfig>) -> NodeRef {
        Arc::new(Self {
            state: Mutex::new(NodeState {
                job,
                ..NodeState::default()
            }),
            load_once: OnceCell::new(),
            path_once: OnceCell::new(),
            waiter: Waiter::new(Arc::clone(&config)),
            config,
        })
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        // Node state stays consistent across a panic, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn key(&self) -> usize {
        self as *const Self as usize
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn get_job(&self) -> Option<Arc<dyn Job>> {
        self.lock().job.clone()
    }

    pub fn set_job(&self, job: Option<Arc<dyn Job>>) {
        self.lock().job = job;
    }

    /// The job's name, or [`UNKNOWN_NAME`] when no job is set
    pub fn name(&self) -> String {
        match self.get_job() {
            Some(job) => job.name(),
            None => UNKNOWN_NAME.to_string(),
        }
    }

    pub fn is_load(&self) -> bool {
        self.lock().is_load
    }

    pub fn set_load(&self) {
        self.lock().is_load = true;
    }

    /// Snapshot of the successors, in insertion order
    pub fn get_next_nodes(&self) -> Vec<NodeRef> {
        self.lock().sub_nodes.clone()
    }

    /// Snapshot of the predecessors that are still alive, in insertion order
    pub fn get_pre_nodes(&self) -> Vec<NodeRef> {
        self.lock().pre_nodes.iter().filter_map(Weak::upgrade).collect()
    }

    /// Add `node` as a successor; returns this node
    pub fn add_sub_node(self: &Arc<Self>, node: &NodeRef) -> NodeRef {
        self.add_sub_nodes([node])
    }

    /// Add each node as a successor, skipping ones already present, and register
    /// this node as their predecessor. Returns this node for chaining.
    ///
    /// Only one node is locked at a time, so a concurrent reader may see the
    /// forward edge before the backward one.
    pub fn add_sub_nodes<'a, I>(self: &Arc<Self>, nodes: I) -> NodeRef
    where
        I: IntoIterator<Item = &'a NodeRef>,
    {
        let nodes: Vec<&NodeRef> = nodes.into_iter().collect();
        {
            let mut state = self.lock();
            for node in &nodes {
                if state.sub_set.insert(node.key()) {
                    state.sub_nodes.push(NodeRef::clone(node));
                }
            }
        }
        for node in nodes {
            node.add_pre_node(self);
        }
        Arc::clone(self)
    }

    /// Add `node` as a successor; returns `node` so chains read left to right
    pub fn next(self: &Arc<Self>, node: &NodeRef) -> NodeRef {
        self.add_sub_node(node);
        NodeRef::clone(node)
    }

    fn add_pre_node(&self, node: &NodeRef) {
        let mut state = self.lock();
        if state.pre_set.insert(node.key()) {
            state.pre_nodes.push(Arc::downgrade(node));
        }
    }

    /// Every path from this node to a leaf
    pub fn get_all_path(self: &Arc<Self>) -> Vec<NodePath> {
        self.to_node_path()
    }

    pub fn to_node_path(self: &Arc<Self>) -> Vec<NodePath> {
        path::all_paths(self)
    }

    /// Every distinct node reachable from this one, itself included
    pub fn get_all_sub_nodes(self: &Arc<Self>) -> Vec<NodeRef> {
        path::distinct_nodes(&self.get_all_path(), |_| true)
    }

    /// Every distinct reachable node whose job is named `name`
    pub fn get_node_by_name(self: &Arc<Self>, name: &str) -> Vec<NodeRef> {
        path::distinct_nodes(&self.get_all_path(), |node| {
            node.get_job().is_some_and(|job| job.name() == name)
        })
    }

    /// Load this node's job, at most once over the node's lifetime.
    ///
    /// Callers arriving while the load runs wait for it to finish. If the job
    /// panics the guard still counts as done and the panic is re-raised to the
    /// caller that ran it; waiting callers carry on.
    pub async fn task_load(&self, ctx: &LoadContext) {
        let mut fault = None;
        let slot = &mut fault;
        self.load_once
            .get_or_init(|| async move {
                self.set_load();
                let Some(job) = self.get_job() else {
                    return;
                };
                debug!(node = %job.name(), "loading job");
                match AssertUnwindSafe(job.load_data(ctx)).catch_unwind().await {
                    Ok(()) => debug!(node = %job.name(), "job loaded"),
                    Err(payload) => {
                        warn!(
                            node = %job.name(),
                            panic = %panic_message(payload.as_ref()),
                            "job load panicked"
                        );
                        *slot = Some(payload);
                    }
                }
            })
            .await;
        if let Some(payload) = fault {
            std::panic::resume_unwind(payload);
        }
    }

    /// Enumerate every path below this node, load each path in its own
    /// concurrent unit and wait for all of them.
    ///
    /// Runs once per node; later calls return immediately. A path whose job
    /// panics stops at that node, the other paths are unaffected.
    pub async fn load_data(self: &Arc<Self>, ctx: &LoadContext) {
        self.path_once
            .get_or_init(|| async move {
                let paths = self.get_all_path();
                if paths.is_empty() {
                    return;
                }
                for (index, route) in paths.into_iter().enumerate() {
                    if self.config.log_paths {
                        info!(index, path = %path::path_name(&route), "load path");
                    }
                    let ctx = ctx.clone();
                    self.waiter.spawn(format!("path-{index}"), async move {
                        for node in &route {
                            node.task_load(&ctx).await;
                        }
                    });
                }
                self.waiter.join().await;
            })
            .await;
    }

    /// Run [`TaskNode::load_data`] in the background and wait for it or for
    /// `ctx` to finish, whichever comes first.
    ///
    /// On cancellation the cause is logged and returned; the background load
    /// is not stopped and keeps running to completion.
    pub async fn load_data_with_context(self: &Arc<Self>, ctx: &LoadContext) -> Result<()> {
        let node = Arc::clone(self);
        let load_ctx = ctx.clone();
        let mut loading = tokio::spawn(async move { node.load_data(&load_ctx).await });

        tokio::select! {
            biased;
            _ = ctx.done() => {
                let err = ctx.err().unwrap_or_else(|| LoaderError::cancelled("context canceled"));
                error!(node = %self.name(), error = %err, "load data error");
                Err(err)
            }
            joined = &mut loading => {
                if let Err(e) = joined {
                    error!(node = %self.name(), error = %e, "load data task failed");
                }
                Ok(())
            }
        }
    }

    /// Log every path below this node
    pub fn show_node(self: &Arc<Self>) {
        for (i, route) in self.get_all_path().iter().enumerate() {
            info!("Path {} --: {}", i, path::path_name(route));
        }
    }

    /// Log the sorted names of every node reachable from this one
    pub fn show_all_nodes(self: &Arc<Self>) {
        let mut names: Vec<String> = self.get_all_sub_nodes().iter().map(|n| n.name()).collect();
        names.sort();
        info!("Nodes:{:?}", names);
    }
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subs: Vec<String> = self.get_next_nodes().iter().map(|n| n.name()).collect();
        write!(f, "jobName:{} subNodes:[{}]", self.name(), subs.join(" "))
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("name", &self.name())
            .field("is_load", &self.is_load())
            .field("sub_nodes", &self.get_next_nodes().len())
            .finish()
    }
}

/// Log every path of `node`, or "empty node" for none
pub fn show_node(node: Option<&NodeRef>) {
    match node {
        Some(node) => node.show_node(),
        None => info!("empty node"),
    }
}
