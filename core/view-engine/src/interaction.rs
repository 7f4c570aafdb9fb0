//! FILENAME: core/view-engine/src/interaction.rs
//! Interaction State Machine - pointer gestures over the grid.
//!
//! The renderer performs hit-testing and feeds typed events in. The machine
//! tracks which gesture is in progress and reports what changed; cell drags
//! are routed into the `CellSelection`.

use grid_model::CellCoord;
use serde::{Deserialize, Serialize};

use crate::selection::{CellSelection, SelectionBounds};

/// Narrowest width a resize gesture can produce.
pub const MIN_COLUMN_WIDTH: f32 = 24.0;

/// What the pointer is over, as resolved by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HitTarget {
    Cell { cell: CellCoord },
    Header { col: usize },
    /// The resize grip of a header; carries the column's current width.
    ResizeHandle { col: usize, width: f32 },
    /// Anywhere outside the cell and header region.
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InteractionEvent {
    PointerDown { target: HitTarget, x: f32 },
    PointerMove { target: HitTarget, x: f32 },
    PointerUp,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Resizing {
        column: usize,
        origin_x: f32,
        origin_width: f32,
    },
    Reordering {
        column: usize,
        over: usize,
    },
    SelectingCells,
}

/// What a single event changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InteractionOutcome {
    None,
    SelectionChanged { bounds: SelectionBounds },
    SelectionCleared,
    ColumnResized { column: usize, width: f32 },
    ColumnMoved { from: usize, to: usize },
    /// A header was pressed and released without moving to another header.
    HeaderClicked { col: usize },
}

#[derive(Debug, Clone)]
pub struct InteractionMachine {
    state: InteractionState,
    selectable_cells: bool,
}

impl InteractionMachine {
    pub fn new(selectable_cells: bool) -> Self {
        InteractionMachine {
            state: InteractionState::Idle,
            selectable_cells,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn handle(&mut self, event: InteractionEvent, selection: &mut CellSelection) -> InteractionOutcome {
        match event {
            InteractionEvent::PointerDown { target, x } => {
                if self.state != InteractionState::Idle {
                    // A release was lost; close out the old gesture first
                    self.release(selection);
                }
                self.press(target, x, selection)
            }
            InteractionEvent::PointerMove { target, x } => self.drag(target, x, selection),
            InteractionEvent::PointerUp => self.release(selection),
            InteractionEvent::Cancel => self.cancel(selection),
        }
    }

    fn press(&mut self, target: HitTarget, x: f32, selection: &mut CellSelection) -> InteractionOutcome {
        match target {
            HitTarget::Cell { cell } if self.selectable_cells => {
                selection.start(cell);
                self.state = InteractionState::SelectingCells;
                selection_changed(selection)
            }
            HitTarget::Cell { .. } => InteractionOutcome::None,
            HitTarget::Header { col } => {
                self.state = InteractionState::Reordering { column: col, over: col };
                InteractionOutcome::None
            }
            HitTarget::ResizeHandle { col, width } => {
                self.state = InteractionState::Resizing {
                    column: col,
                    origin_x: x,
                    origin_width: width,
                };
                InteractionOutcome::None
            }
            HitTarget::Outside => {
                if selection.bounds().is_some() {
                    selection.clear();
                    InteractionOutcome::SelectionCleared
                } else {
                    InteractionOutcome::None
                }
            }
        }
    }

    fn drag(&mut self, target: HitTarget, x: f32, selection: &mut CellSelection) -> InteractionOutcome {
        match (&mut self.state, target) {
            (
                InteractionState::Resizing {
                    column,
                    origin_x,
                    origin_width,
                },
                _,
            ) => InteractionOutcome::ColumnResized {
                column: *column,
                width: (*origin_width + (x - *origin_x)).max(MIN_COLUMN_WIDTH),
            },
            (InteractionState::Reordering { over, .. }, HitTarget::Header { col }) => {
                *over = col;
                InteractionOutcome::None
            }
            (InteractionState::SelectingCells, HitTarget::Cell { cell }) => {
                if selection.update(cell) {
                    selection_changed(selection)
                } else {
                    InteractionOutcome::None
                }
            }
            _ => InteractionOutcome::None,
        }
    }

    fn release(&mut self, selection: &mut CellSelection) -> InteractionOutcome {
        let outcome = match self.state {
            InteractionState::Reordering { column, over } if column != over => {
                InteractionOutcome::ColumnMoved { from: column, to: over }
            }
            InteractionState::Reordering { column, .. } => InteractionOutcome::HeaderClicked { col: column },
            InteractionState::SelectingCells => {
                selection.finish();
                InteractionOutcome::None
            }
            InteractionState::Resizing { .. } | InteractionState::Idle => InteractionOutcome::None,
        };
        self.state = InteractionState::Idle;
        outcome
    }

    /// Abandons the gesture. A resize snaps back to its starting width.
    fn cancel(&mut self, selection: &mut CellSelection) -> InteractionOutcome {
        let outcome = match self.state {
            InteractionState::Resizing {
                column, origin_width, ..
            } => InteractionOutcome::ColumnResized {
                column,
                width: origin_width,
            },
            InteractionState::SelectingCells => {
                selection.finish();
                InteractionOutcome::None
            }
            _ => InteractionOutcome::None,
        };
        self.state = InteractionState::Idle;
        outcome
    }
}

fn selection_changed(selection: &CellSelection) -> InteractionOutcome {
    match selection.bounds() {
        Some(bounds) => InteractionOutcome::SelectionChanged { bounds },
        None => InteractionOutcome::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(target: HitTarget) -> InteractionEvent {
        InteractionEvent::PointerDown { target, x: 0.0 }
    }

    fn over_cell(row: usize, col: usize) -> InteractionEvent {
        InteractionEvent::PointerMove {
            target: HitTarget::Cell {
                cell: CellCoord::new(row, col),
            },
            x: 0.0,
        }
    }

    #[test]
    fn test_cell_drag_selects_rectangle() {
        let mut machine = InteractionMachine::new(true);
        let mut selection = CellSelection::new();

        machine.handle(down(HitTarget::Cell { cell: CellCoord::new(0, 0) }), &mut selection);
        assert_eq!(machine.state(), InteractionState::SelectingCells);

        let outcome = machine.handle(over_cell(2, 1), &mut selection);
        assert!(matches!(
            outcome,
            InteractionOutcome::SelectionChanged { bounds } if bounds.cell_count() == 6
        ));

        machine.handle(InteractionEvent::PointerUp, &mut selection);
        assert_eq!(machine.state(), InteractionState::Idle);
        assert!(!selection.is_dragging());
        assert_eq!(selection.selected_cells().len(), 6);

        // Moving after release does not extend the selection
        assert_eq!(machine.handle(over_cell(5, 5), &mut selection), InteractionOutcome::None);
    }

    #[test]
    fn test_click_outside_clears() {
        let mut machine = InteractionMachine::new(true);
        let mut selection = CellSelection::new();
        machine.handle(down(HitTarget::Cell { cell: CellCoord::new(1, 1) }), &mut selection);
        machine.handle(InteractionEvent::PointerUp, &mut selection);

        let outcome = machine.handle(down(HitTarget::Outside), &mut selection);
        assert_eq!(outcome, InteractionOutcome::SelectionCleared);
        assert!(selection.bounds().is_none());
    }

    #[test]
    fn test_resize_tracks_pointer_and_clamps() {
        let mut machine = InteractionMachine::new(true);
        let mut selection = CellSelection::new();
        machine.handle(
            InteractionEvent::PointerDown {
                target: HitTarget::ResizeHandle { col: 2, width: 100.0 },
                x: 300.0,
            },
            &mut selection,
        );
        let grow = machine.handle(
            InteractionEvent::PointerMove { target: HitTarget::Outside, x: 340.0 },
            &mut selection,
        );
        assert_eq!(grow, InteractionOutcome::ColumnResized { column: 2, width: 140.0 });

        let shrink = machine.handle(
            InteractionEvent::PointerMove { target: HitTarget::Outside, x: 0.0 },
            &mut selection,
        );
        assert_eq!(shrink, InteractionOutcome::ColumnResized { column: 2, width: MIN_COLUMN_WIDTH });

        let cancel = machine.handle(InteractionEvent::Cancel, &mut selection);
        assert_eq!(cancel, InteractionOutcome::ColumnResized { column: 2, width: 100.0 });
        assert_eq!(machine.state(), InteractionState::Idle);
    }

    #[test]
    fn test_header_drag_moves_column() {
        let mut machine = InteractionMachine::new(true);
        let mut selection = CellSelection::new();
        machine.handle(down(HitTarget::Header { col: 0 }), &mut selection);
        machine.handle(
            InteractionEvent::PointerMove { target: HitTarget::Header { col: 3 }, x: 0.0 },
            &mut selection,
        );
        let outcome = machine.handle(InteractionEvent::PointerUp, &mut selection);
        assert_eq!(outcome, InteractionOutcome::ColumnMoved { from: 0, to: 3 });
    }

    #[test]
    fn test_header_press_and_release_is_a_click() {
        let mut machine = InteractionMachine::new(true);
        let mut selection = CellSelection::new();
        machine.handle(down(HitTarget::Header { col: 1 }), &mut selection);
        let outcome = machine.handle(InteractionEvent::PointerUp, &mut selection);
        assert_eq!(outcome, InteractionOutcome::HeaderClicked { col: 1 });
    }

    #[test]
    fn test_cells_not_selectable() {
        let mut machine = InteractionMachine::new(false);
        let mut selection = CellSelection::new();
        let outcome = machine.handle(down(HitTarget::Cell { cell: CellCoord::new(0, 0) }), &mut selection);
        assert_eq!(outcome, InteractionOutcome::None);
        assert_eq!(machine.state(), InteractionState::Idle);
    }
}
