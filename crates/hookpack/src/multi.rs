//! Coordination of several compilers built from one multi-target configuration.
//!
//! Compilers may name siblings they depend on. The dependency graph is
//! checked for cycles at construction; runs and watch sessions then start a
//! compiler only after all of its prerequisites produced a successful pass.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use hookpack_config::WatchOptions;
use parking_lot::Mutex;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::compiler::{Compiler, Watching};
use crate::stats::{MultiStats, Stats};
use crate::{Error, Result};

pub struct MultiCompiler {
    compilers: Vec<Arc<Compiler>>,
    /// Prerequisite indices per compiler
    dependencies: Vec<Vec<usize>>,
    running: AtomicBool,
    watching: Mutex<Option<MultiWatching>>,
}

impl MultiCompiler {
    pub fn new(compilers: Vec<Arc<Compiler>>) -> Self {
        let dependencies = vec![Vec::new(); compilers.len()];
        Self {
            compilers,
            dependencies,
            running: AtomicBool::new(false),
            watching: Mutex::new(None),
        }
    }

    pub fn compilers(&self) -> &[Arc<Compiler>] {
        &self.compilers
    }

    pub fn len(&self) -> usize {
        self.compilers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compilers.is_empty()
    }

    /// Names of the compilers the compiler at `index` waits for.
    pub fn dependencies_of(&self, index: usize) -> Vec<String> {
        self.dependencies
            .get(index)
            .map(|deps| deps.iter().map(|&dep| self.label(dep)).collect())
            .unwrap_or_default()
    }

    /// Declare that the compiler at `index` waits for the named siblings.
    pub fn set_dependencies(&mut self, index: usize, names: &[String]) -> Result<()> {
        let mut prerequisites = Vec::with_capacity(names.len());
        for name in names {
            let mut matches = self
                .compilers
                .iter()
                .enumerate()
                .filter(|(_, compiler)| compiler.name() == Some(name.as_str()))
                .map(|(position, _)| position);
            let position = matches.next().ok_or_else(|| Error::UnknownDependency {
                compiler: self.label(index),
                dependency: name.clone(),
            })?;
            if matches.next().is_some() {
                return Err(Error::AmbiguousDependency {
                    compiler: self.label(index),
                    dependency: name.clone(),
                });
            }
            prerequisites.push(position);
        }
        self.dependencies[index] = prerequisites;
        Ok(())
    }

    /// Fail with [`Error::CyclicDependency`] if the declared dependencies loop.
    pub fn validate_dependencies(&self) -> Result<()> {
        if let Some(index) = (0..self.dependencies.len()).find(|&i| self.dependencies[i].contains(&i))
        {
            return Err(Error::CyclicDependency {
                cycle: vec![self.label(index), self.label(index)],
            });
        }

        let mut graph = DiGraph::<usize, ()>::new();
        let nodes: Vec<NodeIndex> = (0..self.compilers.len())
            .map(|index| graph.add_node(index))
            .collect();

        // Edge from prerequisite to dependent
        for (dependent, prerequisites) in self.dependencies.iter().enumerate() {
            for &prerequisite in prerequisites {
                graph.add_edge(nodes[prerequisite], nodes[dependent], ());
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            let start = graph[cycle.node_id()];
            let mut names: Vec<String> = self
                .cycle_through(start)
                .into_iter()
                .map(|index| self.label(index))
                .collect();
            names.push(self.label(start));
            Error::CyclicDependency { cycle: names }
        })?;
        Ok(())
    }

    fn cycle_through(&self, start: usize) -> Vec<usize> {
        let mut path = vec![start];
        let mut visited = HashSet::from([start]);
        self.find_back(start, start, &mut path, &mut visited);
        path
    }

    fn find_back(
        &self,
        current: usize,
        start: usize,
        path: &mut Vec<usize>,
        visited: &mut HashSet<usize>,
    ) -> bool {
        for &next in &self.dependencies[current] {
            if next == start {
                return true;
            }
            if visited.insert(next) {
                path.push(next);
                if self.find_back(next, start, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    fn label(&self, index: usize) -> String {
        self.compilers[index]
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("compiler[{index}]"))
    }

    /// Run every compiler once, respecting declared dependencies.
    ///
    /// Independent compilers run concurrently. After the first failure no
    /// further compiler is started; the failure is returned once the running
    /// ones settled.
    pub async fn run(&self) -> Result<MultiStats> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(Error::ConcurrentRun);
        }
        let result = self.run_in_waves().await;
        self.running.store(false, Ordering::Release);
        result
    }

    async fn run_in_waves(&self) -> Result<MultiStats> {
        let count = self.compilers.len();
        let mut results: Vec<Option<Stats>> = vec![None; count];
        let mut started = vec![false; count];
        let mut first_error: Option<Error> = None;
        let mut running = FuturesUnordered::new();

        loop {
            if first_error.is_none() {
                for index in 0..count {
                    let ready = self.dependencies[index]
                        .iter()
                        .all(|&dep| results[dep].is_some());
                    if !started[index] && ready {
                        started[index] = true;
                        let compiler = self.compilers[index].clone();
                        tracing::debug!(compiler = %self.label(index), "starting compiler");
                        running.push(async move { (index, compiler.run().await) });
                    }
                }
            }

            let Some((index, result)) = running.next().await else {
                break;
            };
            match result {
                Ok(stats) => results[index] = Some(stats),
                Err(err) => {
                    tracing::warn!(compiler = %self.label(index), error = %err, "compiler failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(MultiStats::new(results.into_iter().flatten().collect())),
        }
    }

    /// Watch every compiler, starting dependents after their prerequisites' first successful pass.
    ///
    /// `options` holds the watch options per compiler, in declaration order;
    /// missing entries use the defaults. The handler receives the combined
    /// stats whenever every compiler has a result, and each error as it
    /// happens.
    pub fn watch<F>(&self, options: Vec<WatchOptions>, handler: F) -> MultiWatching
    where
        F: FnMut(Result<MultiStats>) + Send + 'static,
    {
        let watching = MultiWatching::start(
            self.compilers.clone(),
            self.dependencies.clone(),
            options,
            handler,
        );
        *self.watching.lock() = Some(watching.clone());
        watching
    }

    /// Close the watch session, if any, and every compiler.
    ///
    /// Every compiler is closed even if one fails; the first failure is returned.
    pub async fn close(&self) -> Result<()> {
        let watching = self.watching.lock().take();
        if let Some(watching) = watching {
            watching.close().await;
        }

        let mut first_error = None;
        for compiler in &self.compilers {
            if let Err(err) = compiler.close().await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for MultiCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiCompiler")
            .field("compilers", &self.compilers)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Handle to the watch session of a [`MultiCompiler`].
#[derive(Clone)]
pub struct MultiWatching {
    inner: Arc<MultiWatchingInner>,
}

struct MultiWatchingInner {
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Coordinator {
    compilers: Vec<Arc<Compiler>>,
    dependencies: Vec<Vec<usize>>,
    options: Vec<WatchOptions>,
    events: mpsc::UnboundedSender<(usize, Result<Stats>)>,
    started: Vec<Option<Watching>>,
    passed: Vec<bool>,
}

impl Coordinator {
    /// Start watching every compiler whose prerequisites all passed once.
    fn start_ready(&mut self) {
        for index in 0..self.compilers.len() {
            let ready = self.dependencies[index].iter().all(|&dep| self.passed[dep]);
            if self.started[index].is_some() || !ready {
                continue;
            }

            let events = self.events.clone();
            let options = self.options.get(index).cloned().unwrap_or_default();
            tracing::debug!(compiler = ?self.compilers[index].name(), "starting watcher");
            let watching = self.compilers[index].watch(options, move |result| {
                let _ = events.send((index, result));
            });
            self.started[index] = Some(watching);
        }
    }

    async fn close(self) {
        for watching in self.started.into_iter().flatten() {
            watching.close().await;
        }
    }
}

impl MultiWatching {
    fn start<F>(
        compilers: Vec<Arc<Compiler>>,
        dependencies: Vec<Vec<usize>>,
        options: Vec<WatchOptions>,
        handler: F,
    ) -> Self
    where
        F: FnMut(Result<MultiStats>) + Send + 'static,
    {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (events, events_rx) = mpsc::unbounded_channel();
        let count = compilers.len();
        let coordinator = Coordinator {
            compilers,
            dependencies,
            options,
            events,
            started: (0..count).map(|_| None).collect(),
            passed: vec![false; count],
        };

        let watching = Self {
            inner: Arc::new(MultiWatchingInner {
                shutdown,
                task: Mutex::new(None),
            }),
        };
        let task = tokio::spawn(coordinate(coordinator, events_rx, shutdown_rx, handler));
        *watching.inner.task.lock() = Some(task);
        watching
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Close every child watch session.
    pub async fn close(&self) {
        self.inner.shutdown.send_replace(true);
        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "multi-compiler watch task ended abnormally");
            }
        }
    }
}

impl fmt::Debug for MultiWatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiWatching")
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn coordinate<F>(
    mut coordinator: Coordinator,
    mut events: mpsc::UnboundedReceiver<(usize, Result<Stats>)>,
    mut shutdown: watch::Receiver<bool>,
    mut handler: F,
) where
    F: FnMut(Result<MultiStats>) + Send + 'static,
{
    let mut latest: Vec<Option<Stats>> = vec![None; coordinator.compilers.len()];
    coordinator.start_ready();

    loop {
        let event = tokio::select! {
            _ = closed(&mut shutdown) => None,
            event = events.recv() => event,
        };
        let Some((index, result)) = event else { break };

        match result {
            Ok(stats) => {
                latest[index] = Some(stats);
                if !coordinator.passed[index] {
                    coordinator.passed[index] = true;
                    coordinator.start_ready();
                }
                if latest.iter().all(Option::is_some) {
                    handler(Ok(MultiStats::new(latest.iter().flatten().cloned().collect())));
                }
            }
            Err(err) => handler(Err(err)),
        }
    }

    coordinator.close().await;
}

async fn closed(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}
