//! Scene store for measurement lines, selection handles, and labels
//!
//! Pure data-structure mutations; rendering pulls from here and never gets
//! pushed to. Selection is stored as a pair of handles or nothing, so the
//! "exactly 0 or 2 handles" invariant holds by construction.

pub mod label;

use std::collections::{HashMap, HashSet};

use crate::domain::{LineId, MeasureLine, Point, Rgb, SelectionHandle};
use crate::render::geometry::{handle, line as line_geom, segment_distance};

#[derive(Debug, Default)]
pub struct SceneStore {
    lines: HashMap<LineId, MeasureLine>,
    next_id: u64,
    selection: Option<[SelectionHandle; 2]>,
    /// Lines whose distance label is currently visible
    labeled: HashSet<LineId>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line between `a` and `b`; its pixel length is computed here
    pub fn add_line(&mut self, a: Point, b: Point, color: Rgb) -> LineId {
        let id = LineId(self.next_id);
        self.next_id += 1;
        self.lines.insert(id, MeasureLine::new(a, b, color));
        id
    }

    /// Replace both endpoints of a line, recomputing its pixel length
    pub fn update_line(&mut self, id: LineId, a: Point, b: Point) {
        let line = self.lines.get_mut(&id).expect("unknown line handle");
        line.set_endpoints(a, b);
    }

    /// Remove a line and everything it owns: selection handles and label
    pub fn remove_line(&mut self, id: LineId) {
        self.lines.remove(&id);
        self.labeled.remove(&id);
        if self.selected_line() == Some(id) {
            self.selection = None;
        }
    }

    /// Drop every line, handle, and label
    pub fn clear(&mut self) {
        self.lines.clear();
        self.labeled.clear();
        self.selection = None;
    }

    pub fn line(&self, id: LineId) -> Option<&MeasureLine> {
        self.lines.get(&id)
    }

    pub fn lines(&self) -> impl Iterator<Item = (LineId, &MeasureLine)> {
        self.lines.iter().map(|(id, line)| (*id, line))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Select a line (creating both endpoint handles) or clear the selection
    ///
    /// Handles of a previously selected line are dropped before the new pair
    /// is created.
    pub fn set_selection(&mut self, id: Option<LineId>) {
        self.selection = None;
        if let Some(id) = id {
            let line = self.lines.get(&id).expect("selecting unknown line handle");
            self.selection = Some([
                SelectionHandle { line: id, pos: line.a },
                SelectionHandle { line: id, pos: line.b },
            ]);
        }
    }

    pub fn selection(&self) -> Option<&[SelectionHandle; 2]> {
        self.selection.as_ref()
    }

    pub fn selected_line(&self) -> Option<LineId> {
        self.selection.as_ref().map(|handles| handles[0].line)
    }

    /// Move one selection handle; the line is redrawn between the two
    /// handles' current positions
    pub fn drag_handle(&mut self, index: usize, dx: f64, dy: f64) {
        let handles = self
            .selection
            .as_mut()
            .expect("dragging a handle with no selection");
        handles[index].pos = handles[index].pos.translated(dx, dy);

        let id = handles[index].line;
        let (a, b) = (handles[0].pos, handles[1].pos);
        self.update_line(id, a, b);
    }

    /// Move a whole line; its selection handles travel with it
    pub fn translate_line(&mut self, id: LineId, dx: f64, dy: f64) {
        let line = self.lines.get_mut(&id).expect("unknown line handle");
        let (a, b) = (line.a.translated(dx, dy), line.b.translated(dx, dy));
        line.set_endpoints(a, b);

        if let Some(handles) = self.selection.as_mut() {
            if handles[0].line == id {
                for h in handles.iter_mut() {
                    h.pos = h.pos.translated(dx, dy);
                }
            }
        }
    }

    /// Every line whose stroke passes within the hit radius of `p`
    pub fn query_at(&self, p: Point) -> Vec<LineId> {
        let mut hits: Vec<LineId> = self
            .lines
            .iter()
            .filter(|(_, line)| segment_distance(p, line.a, line.b) <= line_geom::HIT_RADIUS)
            .map(|(id, _)| *id)
            .collect();
        // Newest line on top, matching draw order
        hits.sort();
        hits
    }

    /// Index of the selection handle under `p`, if any
    pub fn handle_at(&self, p: Point) -> Option<usize> {
        let handles = self.selection.as_ref()?;
        handles
            .iter()
            .position(|h| h.pos.distance_to(p) <= handle::HIT_RADIUS)
    }

    pub fn set_label_visible(&mut self, id: LineId, visible: bool) {
        assert!(self.lines.contains_key(&id), "labeling unknown line handle");
        if visible {
            self.labeled.insert(id);
        } else {
            self.labeled.remove(&id);
        }
    }

    pub fn label_visible(&self, id: LineId) -> bool {
        self.labeled.contains(&id)
    }

    /// Labels for every visible line, formatted by `format`
    ///
    /// Derived on demand so a calibration change is reflected without any
    /// bookkeeping here.
    pub fn labels<'a>(
        &'a self,
        format: impl Fn(&MeasureLine) -> String + 'a,
    ) -> impl Iterator<Item = (LineId, label::DistanceLabel)> + 'a {
        self.labeled.iter().filter_map(move |id| {
            let line = self.lines.get(id)?;
            Some((*id, label::place(line, format(line))))
        })
    }
}
