//! Grid layout.
//!
//! A [`Cursor`] is the row where the next section begins. Sections place
//! widgets row by row; a row is as tall as its tallest widget and a section
//! advances the cursor by the sum of its row heights.

use common::models::{Rect, Widget, GRID_COLUMNS};

/// Vertical offset on the dashboard grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(u32);

impl Cursor {
    pub const TOP: Cursor = Cursor(0);

    pub fn y(self) -> u32 {
        self.0
    }
}

/// Widgets of one section being laid out from a starting cursor.
#[derive(Debug)]
pub struct Section {
    y: u32,
    widgets: Vec<Widget>,
}

impl Section {
    pub fn start(cursor: Cursor) -> Self {
        Self {
            y: cursor.0,
            widgets: Vec::new(),
        }
    }

    /// Lays out one row left to right.
    pub fn row(&mut self, build: impl FnOnce(&mut Row<'_>)) {
        let mut row = Row {
            y: self.y,
            x: 0,
            height: 0,
            widgets: &mut self.widgets,
        };
        build(&mut row);
        self.y += row.height;
    }

    /// Lays out `cells` in rows of `GRID_COLUMNS / width` cells.
    pub fn grid<I, F>(&mut self, width: u32, height: u32, cells: I)
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(Rect) -> Widget,
    {
        let per_row = (GRID_COLUMNS / width).max(1) as usize;
        let mut cells = cells.into_iter().peekable();
        while cells.peek().is_some() {
            self.row(|row| {
                for cell in cells.by_ref().take(per_row) {
                    row.place(width, height, cell);
                }
            });
        }
    }

    /// Finished widgets and the cursor below them.
    pub fn finish(self) -> (Vec<Widget>, Cursor) {
        (self.widgets, Cursor(self.y))
    }
}

/// One row of a [`Section`].
pub struct Row<'a> {
    y: u32,
    x: u32,
    height: u32,
    widgets: &'a mut Vec<Widget>,
}

impl Row<'_> {
    /// Places a widget of the given size right of the previous one.
    pub fn place(&mut self, width: u32, height: u32, build: impl FnOnce(Rect) -> Widget) {
        let rect = Rect::new(self.x, self.y, width, height);
        self.widgets.push(build(rect));
        self.x += width;
        self.height = self.height.max(height);
    }

    /// Places a text widget.
    pub fn text(&mut self, width: u32, height: u32, markdown: impl Into<String>) {
        self.place(width, height, |rect| Widget::text(rect, markdown));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_height_is_tallest_widget() {
        let mut section = Section::start(Cursor(10));
        section.row(|row| {
            row.text(12, 2, "a");
            row.text(12, 5, "b");
        });
        section.row(|row| row.text(24, 1, "c"));
        let (widgets, next) = section.finish();

        assert_eq!(next.y(), 16);
        assert_eq!(widgets[1].rect(), &Rect::new(12, 10, 12, 5));
        assert_eq!(widgets[2].rect(), &Rect::new(0, 15, 24, 1));
    }

    #[test]
    fn test_empty_section_keeps_cursor() {
        let (widgets, next) = Section::start(Cursor(7)).finish();
        assert!(widgets.is_empty());
        assert_eq!(next, Cursor(7));
    }

    #[test]
    fn test_grid_wraps_after_four_cells() {
        let mut section = Section::start(Cursor::TOP);
        section.grid(6, 6, (0..5).map(|i| move |rect| Widget::text(rect, format!("{i}"))));
        let (widgets, next) = section.finish();

        assert_eq!(next.y(), 12);
        assert_eq!(widgets[3].rect(), &Rect::new(18, 0, 6, 6));
        assert_eq!(widgets[4].rect(), &Rect::new(0, 6, 6, 6));
    }
}
