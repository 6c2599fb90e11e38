//! In-memory host used for dry runs and tests.
//!
//! A [`SimulatedDevice`] holds a static element tree and a single vertical
//! scroll offset. Nodes can be pinned to a range of offsets so that forward
//! and backward scrolls reveal or hide them, which is enough to exercise the
//! scroll-bounded search. Every primitive call is recorded.

use serde::Deserialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::ControlError;
use crate::types::{NodeAttributes, NodeHandle};
use crate::{InputInjector, UiProvider};

/// Fixture description of one node.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedNode {
    pub class_name: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub focused: bool,
    /// Inclusive scroll offsets at which the node is on screen.
    #[serde(default)]
    pub visible_at: Option<(u32, u32)>,
    #[serde(default)]
    pub children: Vec<SimulatedNode>,
}

fn default_visible() -> bool {
    true
}

impl SimulatedNode {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            text: None,
            description: None,
            visible: true,
            clickable: false,
            focused: false,
            visible_at: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }

    /// Only on screen while the scroll offset is within `first..=last`.
    pub fn visible_between(mut self, first: u32, last: u32) -> Self {
        self.visible_at = Some((first, last));
        self
    }

    pub fn with_children(mut self, children: Vec<SimulatedNode>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    max_scroll: u32,
    root: SimulatedNode,
}

#[derive(Debug)]
struct Slot {
    attrs: NodeAttributes,
    visible_at: Option<(u32, u32)>,
    children: Vec<NodeHandle>,
}

/// A recorded gesture or input call.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Tap { x: f32, y: f32 },
    Swipe { x0: f32, y0: f32, x1: f32, y1: f32, duration_ms: u64 },
    SetText { node: NodeHandle, text: String },
    Click { node: NodeHandle },
}

#[derive(Debug, Default)]
struct State {
    slots: Vec<Slot>,
    root: Option<NodeHandle>,
    focused: Option<NodeHandle>,
    scroll_offset: u32,
    max_scroll: u32,
    forward_scrolls: usize,
    backward_scrolls: usize,
    input_attempts: usize,
    failures_remaining: usize,
    events: Vec<InputEvent>,
}

impl State {
    fn slot(&self, node: NodeHandle) -> Result<&Slot, ControlError> {
        self.slots
            .get(node.0 as usize)
            .ok_or(ControlError::StaleNode(node))
    }

    fn on_screen(&self, slot: &Slot) -> bool {
        slot.attrs.visible
            && slot
                .visible_at
                .map_or(true, |(first, last)| (first..=last).contains(&self.scroll_offset))
    }

    fn insert(&mut self, node: SimulatedNode) -> NodeHandle {
        let handle = NodeHandle(self.slots.len() as u64);
        if node.focused {
            self.focused = Some(handle);
        }
        self.slots.push(Slot {
            attrs: NodeAttributes {
                class_name: node.class_name,
                text: node.text,
                description: node.description,
                visible: node.visible,
                clickable: node.clickable,
            },
            visible_at: node.visible_at,
            children: Vec::new(),
        });

        let children = node
            .children
            .into_iter()
            .map(|child| self.insert(child))
            .collect();
        self.slots[handle.0 as usize].children = children;
        handle
    }

    /// Consume one injected failure, if any are queued.
    fn attempt_input(&mut self) -> Result<(), ControlError> {
        self.input_attempts += 1;
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(ControlError::Injection("simulated failure".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimulatedDevice {
    state: Mutex<State>,
}

impl SimulatedDevice {
    pub fn new(root: SimulatedNode) -> Self {
        let mut state = State::default();
        state.root = Some(state.insert(root));
        Self {
            state: Mutex::new(state),
        }
    }

    /// A device with no active window.
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Load a screen from a JSON fixture of the form
    /// `{ "max_scroll": 3, "root": { "class_name": ..., "children": [...] } }`.
    pub fn from_fixture(path: &Path) -> Result<Self, ControlError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ControlError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_fixture_str(&content)
    }

    pub fn from_fixture_str(content: &str) -> Result<Self, ControlError> {
        let fixture: Fixture =
            serde_json::from_str(content).map_err(|e| ControlError::Fixture(e.to_string()))?;
        Ok(Self::new(fixture.root).with_max_scroll(fixture.max_scroll))
    }

    /// Number of forward scrolls available from the top.
    pub fn with_max_scroll(self, max_scroll: u32) -> Self {
        self.lock().max_scroll = max_scroll;
        self
    }

    /// Make the next `count` input primitives fail.
    pub fn fail_next_inputs(&self, count: usize) {
        self.lock().failures_remaining = count;
    }

    pub fn scroll_offset(&self) -> u32 {
        self.lock().scroll_offset
    }

    /// Total scroll calls issued, in either direction.
    pub fn scroll_calls(&self) -> usize {
        let state = self.lock();
        state.forward_scrolls + state.backward_scrolls
    }

    pub fn forward_scrolls(&self) -> usize {
        self.lock().forward_scrolls
    }

    pub fn backward_scrolls(&self) -> usize {
        self.lock().backward_scrolls
    }

    /// Calls to tap, swipe, set_text and click, failed ones included.
    pub fn input_attempts(&self) -> usize {
        self.lock().input_attempts
    }

    /// Successful input primitives in call order.
    pub fn events(&self) -> Vec<InputEvent> {
        self.lock().events.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the state usable for tests.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl UiProvider for SimulatedDevice {
    fn root(&self) -> Option<NodeHandle> {
        self.lock().root
    }

    fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>, ControlError> {
        let state = self.lock();
        Ok(state.slot(node)?.children.clone())
    }

    fn attributes(&self, node: NodeHandle) -> Result<NodeAttributes, ControlError> {
        let state = self.lock();
        let slot = state.slot(node)?;
        let mut attrs = slot.attrs.clone();
        attrs.visible = state.on_screen(slot);
        Ok(attrs)
    }

    fn find_by_text(&self, text: &str) -> Vec<NodeHandle> {
        // Loose, case-insensitive containment like most accessibility hosts.
        let needle = text.to_lowercase();
        let state = self.lock();
        state
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                [&slot.attrs.text, &slot.attrs.description]
                    .into_iter()
                    .flatten()
                    .any(|value| value.to_lowercase().contains(&needle))
            })
            .map(|(index, _)| NodeHandle(index as u64))
            .collect()
    }

    fn focused_input(&self) -> Option<NodeHandle> {
        self.lock().focused
    }
}

impl InputInjector for SimulatedDevice {
    fn tap(&self, x: f32, y: f32) -> Result<(), ControlError> {
        let mut state = self.lock();
        state.attempt_input()?;
        state.events.push(InputEvent::Tap { x, y });
        Ok(())
    }

    fn swipe(
        &self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        duration_ms: u64,
    ) -> Result<(), ControlError> {
        let mut state = self.lock();
        state.attempt_input()?;
        state.events.push(InputEvent::Swipe {
            x0,
            y0,
            x1,
            y1,
            duration_ms,
        });
        Ok(())
    }

    fn set_text(&self, node: NodeHandle, text: &str) -> Result<(), ControlError> {
        let mut state = self.lock();
        state.attempt_input()?;
        state.slot(node)?;
        state.slots[node.0 as usize].attrs.text = Some(text.to_string());
        state.events.push(InputEvent::SetText {
            node,
            text: text.to_string(),
        });
        Ok(())
    }

    fn click(&self, node: NodeHandle) -> Result<(), ControlError> {
        let mut state = self.lock();
        state.attempt_input()?;
        state.slot(node)?;
        state.events.push(InputEvent::Click { node });
        Ok(())
    }

    fn scroll_forward(&self) -> bool {
        let mut state = self.lock();
        state.forward_scrolls += 1;
        if state.scroll_offset >= state.max_scroll {
            return false;
        }
        state.scroll_offset += 1;
        debug!("Simulated scroll forward to offset {}", state.scroll_offset);
        true
    }

    fn scroll_backward(&self) -> bool {
        let mut state = self.lock();
        state.backward_scrolls += 1;
        if state.scroll_offset == 0 {
            return false;
        }
        state.scroll_offset -= 1;
        debug!("Simulated scroll backward to offset {}", state.scroll_offset);
        true
    }
}
