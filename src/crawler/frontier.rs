//! Frontier of titles waiting to be visited
//!
//! The frontier is a plain deque; the traversal policy only decides where a
//! batch of newly discovered titles lands:
//! - BFS appends to the tail
//! - DFS prepends the batch to the head, keeping its order
//! - RANDOM appends like BFS, then swaps the head with a random entry
//!
//! Titles that turn out to be visited already are pruned by the worker when
//! they are popped, not here.

use crate::config::SearchAlgo;
use rand::Rng;
use std::collections::VecDeque;

/// Ordered work queue of titles
#[derive(Debug, Clone)]
pub struct Frontier {
    queue: VecDeque<String>,
    policy: SearchAlgo,
}

impl Frontier {
    /// Creates an empty frontier with a fixed policy
    pub fn new(policy: SearchAlgo) -> Self {
        Self {
            queue: VecDeque::new(),
            policy,
        }
    }

    /// Adds a batch of titles according to the policy
    pub fn push<I>(&mut self, titles: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.push_with_rng(titles, &mut rand::rng());
    }

    /// Adds a batch of titles, drawing RANDOM swaps from `rng`
    pub fn push_with_rng<I, R>(&mut self, titles: I, rng: &mut R)
    where
        I: IntoIterator<Item = String>,
        R: Rng,
    {
        let batch: Vec<String> = titles.into_iter().collect();
        if batch.is_empty() {
            return;
        }

        tracing::trace!("Frontier {}: pushing {} titles", self.policy, batch.len());

        match self.policy {
            SearchAlgo::Bfs => self.queue.extend(batch),
            SearchAlgo::Dfs => {
                for title in batch.into_iter().rev() {
                    self.queue.push_front(title);
                }
            }
            SearchAlgo::Random => {
                self.queue.extend(batch);
                let pick = rng.random_range(0..self.queue.len());
                self.queue.swap(0, pick);
            }
        }
    }

    /// Removes the next title; `None` means there is no more known work
    pub fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
