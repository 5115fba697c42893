use std::collections::HashSet;

use crate::{Cell, Coord};
use crate::config::BoardSettings;
use crate::snake::Direction::{self, *};

/// Fixed-size playing field measured in board units. Every valid cell is a
/// multiple of `cell_size` with `0 <= x < width` and `0 <= y < height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Board {
    width: Coord,
    height: Coord,
    cell_size: Coord,
}

impl Board {
    pub fn new(width: Coord, height: Coord, cell_size: Coord) -> Self {
        Board { width, height, cell_size }
    }

    pub fn cell_size(&self) -> Coord {
        self.cell_size
    }

    pub fn columns(&self) -> Coord {
        self.width / self.cell_size
    }

    pub fn rows(&self) -> Coord {
        self.height / self.cell_size
    }

    pub fn advance(&self, head: Cell, direction: Direction) -> Cell {
        let step = self.cell_size;
        match direction {
            Up => (head.0, head.1 - step),
            Down => (head.0, head.1 + step),
            Left => (head.0 - step, head.1),
            Right => (head.0 + step, head.1),
        }
    }

    /// Maps a cell that stepped past an edge onto the opposite edge.
    pub fn wrap(&self, cell: Cell) -> Cell {
        let (mut x, mut y) = cell;

        if x < 0 {
            x = self.width - self.cell_size;
        } else if x >= self.width {
            x = 0;
        }

        if y < 0 {
            y = self.height - self.cell_size;
        } else if y >= self.height {
            y = 0;
        }

        (x, y)
    }

    pub fn is_out_of_bounds(&self, cell: Cell) -> bool {
        cell.0 < 0 || cell.1 < 0 || cell.0 >= self.width || cell.1 >= self.height
    }

    /// Row-major (column, row) index of a cell, used by the renderer.
    pub fn to_grid(&self, cell: Cell) -> (Coord, Coord) {
        (cell.0 / self.cell_size, cell.1 / self.cell_size)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let size = self.cell_size;
        (0..self.rows()).flat_map(move |row| (0..self.columns()).map(move |col| (col * size, row * size)))
    }

    pub fn free_cells(&self, occupied: &HashSet<Cell>) -> Vec<Cell> {
        self.cells().filter(|cell| !occupied.contains(cell)).collect()
    }

    /// Head cell for a fresh snake whose tail sits on the board centre and
    /// whose body extends to the right.
    pub fn spawn_head(&self, length: usize) -> Cell {
        let size = self.cell_size;
        let tail = ((self.columns() / 2) * size, (self.rows() / 2) * size);
        (tail.0 + (length as Coord - 1) * size, tail.1)
    }
}

impl From<&BoardSettings> for Board {
    fn from(settings: &BoardSettings) -> Self {
        Board::new(settings.width, settings.height, settings.cell_size)
    }
}

/// True when `cell` lands on any body cell other than the head, which is the
/// last element of `body`.
pub fn is_self_collision(cell: Cell, body: &[Cell]) -> bool {
    match body.split_last() {
        Some((_, rest)) => rest.contains(&cell),
        None => false,
    }
}
