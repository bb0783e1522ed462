//! Autocomplete dropdown state: visibility, highlighted candidate, commit.
//!
//! The machine is UI-agnostic. A front end feeds it input events and renders
//! `candidates()`, `highlighted()` and `visibility()`; rendering and focus
//! handling stay on the front-end side.

use std::sync::Arc;
use std::time::Duration;

use crate::error::LookupError;
use crate::locality::LocalityIndex;
use crate::suggest;
use crate::types::{CitySelection, LocalityEntry};

/// Delay between a commit and the list closing, so a click handler can finish first.
pub const CLOSE_GRACE: Duration = Duration::from_millis(120);

/// Minimum trimmed length of a freeform (non-candidate) search.
pub const MIN_FREEFORM_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Closed,
    Open,
    /// Committed; waiting for `finish_close()`.
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorSource {
    Keyboard,
    Pointer,
}

/// Highlighted candidate. Keyboard and hover share it, last writer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCursor {
    pub index: Option<usize>,
    pub source: CursorSource,
}

impl SelectionCursor {
    fn none() -> Self {
        Self {
            index: None,
            source: CursorSource::Keyboard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

pub type ElementId = u64;

/// A pointer-down somewhere in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerEvent {
    pub target: ElementId,
    /// Composed event path, innermost first, when the platform exposes one.
    pub composed_path: Option<Vec<ElementId>>,
}

/// Containment queries against the rendered element tree.
pub trait ElementTree {
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool;
}

/// Whether a pointer-down landed outside both the input and the suggestion list.
///
/// Uses the composed path when available, otherwise falls back to asking the
/// element tree whether the list contains the target.
pub fn is_outside_click(
    event: &PointerEvent,
    input: ElementId,
    list: Option<ElementId>,
    tree: &dyn ElementTree,
) -> bool {
    match &event.composed_path {
        Some(path) => !path
            .iter()
            .any(|el| *el == input || Some(*el) == list),
        None => {
            let in_list = list.is_some_and(|l| l == event.target || tree.contains(l, event.target));
            !in_list && event.target != input
        }
    }
}

type SelectCallback = Box<dyn FnMut(&CitySelection) + Send>;

pub struct Autocomplete {
    index: Arc<LocalityIndex>,
    query: String,
    candidates: Vec<usize>,
    cursor: SelectionCursor,
    visibility: Visibility,
    on_select: SelectCallback,
}

impl std::fmt::Debug for Autocomplete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autocomplete")
            .field("query", &self.query)
            .field("candidates", &self.candidates.len())
            .field("cursor", &self.cursor)
            .field("visibility", &self.visibility)
            .finish()
    }
}

impl Autocomplete {
    pub fn new(index: Arc<LocalityIndex>, on_select: impl FnMut(&CitySelection) + Send + 'static) -> Self {
        Self {
            index,
            query: String::new(),
            candidates: Vec::new(),
            cursor: SelectionCursor::none(),
            visibility: Visibility::Closed,
            on_select: Box::new(on_select),
        }
    }

    /// Swap in a freshly loaded index and re-filter the current query.
    pub fn set_index(&mut self, index: Arc<LocalityIndex>) {
        self.index = index;
        self.refilter();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_open(&self) -> bool {
        self.visibility != Visibility::Closed
    }

    pub fn cursor(&self) -> SelectionCursor {
        self.cursor
    }

    /// Index of the candidate to render highlighted.
    pub fn highlighted(&self) -> Option<usize> {
        self.cursor.index
    }

    pub fn candidates(&self) -> impl Iterator<Item = &LocalityEntry> + '_ {
        let entries = self.index.entries();
        self.candidates.iter().filter_map(move |&pos| entries.get(pos))
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    fn candidate(&self, i: usize) -> Option<&LocalityEntry> {
        self.candidates
            .get(i)
            .and_then(|&pos| self.index.entries().get(pos))
    }

    fn refilter(&mut self) {
        self.candidates = suggest::filter_positions(&self.query, self.index.entries());
        self.cursor = SelectionCursor::none();
        self.visibility = if self.candidates.is_empty() {
            Visibility::Closed
        } else {
            Visibility::Open
        };
    }

    pub fn set_query(&mut self, text: &str) {
        self.query = text.to_string();
        self.refilter();
    }

    /// Input regained focus: reopen if the query still has candidates.
    pub fn focus(&mut self) {
        self.cursor = SelectionCursor::none();
        if !self.candidates.is_empty() {
            self.visibility = Visibility::Open;
        }
    }

    /// Input lost focus. Focus moving into the list keeps it open.
    pub fn blur(&mut self, focus_in_list: bool) {
        if !focus_in_list {
            self.close();
        }
    }

    pub fn close(&mut self) {
        self.visibility = Visibility::Closed;
        self.cursor = SelectionCursor::none();
    }

    /// Complete a pending close once `CLOSE_GRACE` has elapsed.
    pub fn finish_close(&mut self) {
        if self.visibility == Visibility::Closing {
            self.visibility = Visibility::Closed;
        }
    }

    /// Enter commits; arrows move; escape closes.
    ///
    /// Returns the committed selection on `Enter`, or `LookupError::Validation`
    /// when a freeform query is too short.
    pub fn handle_key(&mut self, key: Key) -> Result<Option<CitySelection>, LookupError> {
        match key {
            Key::Enter => self.commit().map(Some),
            Key::ArrowDown => {
                self.step(1);
                Ok(None)
            }
            Key::ArrowUp => {
                self.step(-1);
                Ok(None)
            }
            Key::Escape => {
                if self.visibility == Visibility::Open {
                    self.close();
                }
                Ok(None)
            }
        }
    }

    fn step(&mut self, delta: isize) {
        if self.visibility != Visibility::Open || self.candidates.is_empty() {
            return;
        }
        let last = self.candidates.len() - 1;
        let next = match (self.cursor.index, delta) {
            (None, _) => 0,
            (Some(i), d) if d > 0 => (i + 1).min(last),
            (Some(i), _) => i.saturating_sub(1),
        };
        self.cursor = SelectionCursor {
            index: Some(next),
            source: CursorSource::Keyboard,
        };
    }

    pub fn hover(&mut self, i: usize) {
        if self.visibility == Visibility::Open && i < self.candidates.len() {
            self.cursor = SelectionCursor {
                index: Some(i),
                source: CursorSource::Pointer,
            };
        }
    }

    pub fn click_candidate(&mut self, i: usize) -> Option<CitySelection> {
        if self.visibility == Visibility::Closed || i >= self.candidates.len() {
            return None;
        }
        self.cursor = SelectionCursor {
            index: Some(i),
            source: CursorSource::Pointer,
        };
        self.commit().ok()
    }

    /// Document-level pointer-down; closes the list when it landed outside.
    pub fn pointer_down(
        &mut self,
        event: &PointerEvent,
        input: ElementId,
        list: Option<ElementId>,
        tree: &dyn ElementTree,
    ) {
        if self.is_open() && is_outside_click(event, input, list, tree) {
            self.close();
        }
    }

    fn commit(&mut self) -> Result<CitySelection, LookupError> {
        let selection = match self.cursor.index.and_then(|i| self.candidate(i)) {
            Some(entry) => CitySelection {
                label: entry.display_name.trim().to_string(),
                coordinates: entry.coordinates(),
            },
            None => {
                let trimmed = self.query.trim();
                if trimmed.chars().count() < MIN_FREEFORM_CHARS {
                    return Err(LookupError::validation(format!(
                        "Type at least {} characters",
                        MIN_FREEFORM_CHARS
                    )));
                }
                CitySelection::freeform(trimmed)
            }
        };

        self.query = selection.label.clone();
        self.cursor = SelectionCursor::none();
        if self.visibility == Visibility::Open {
            self.visibility = Visibility::Closing;
        }
        tracing::debug!("Committed selection: {}", selection.label);
        (self.on_select)(&selection);
        Ok(selection)
    }
}
