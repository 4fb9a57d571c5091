//! Animation lifecycle events.
//!
//! The [`Animator`](crate::animator::Animator) pushes an event whenever an
//! animation starts, completes or is cancelled. Events are polled after
//! each update:
//!
//! ```ignore
//! animator.update(&mut page, 16.0);
//! for event in animator.drain_events() {
//!     if let AnimationEvent::Ended { node_id, .. } = event {
//!         // reveal finished on node_id
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::animator::{AnimationId, AnimationKind};
use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnimationEvent {
    Started {
        animation_id: AnimationId,
        node_id: NodeId,
        kind: AnimationKind,
    },
    /// Every continuation ran.
    Ended {
        animation_id: AnimationId,
        node_id: NodeId,
        kind: AnimationKind,
    },
    /// The handle was cancelled before completion; pending continuations were dropped.
    Cancelled {
        animation_id: AnimationId,
        node_id: NodeId,
        kind: AnimationKind,
    },
}

impl AnimationEvent {
    pub fn animation_id(&self) -> AnimationId {
        match self {
            Self::Started { animation_id, .. }
            | Self::Ended { animation_id, .. }
            | Self::Cancelled { animation_id, .. } => *animation_id,
        }
    }

    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Started { node_id, .. }
            | Self::Ended { node_id, .. }
            | Self::Cancelled { node_id, .. } => *node_id,
        }
    }
}

/// FIFO of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<AnimationEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: AnimationEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = AnimationEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
