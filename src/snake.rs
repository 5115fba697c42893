use crate::{Cell, Coord};
use Direction::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }

    pub fn is_reverse(&self, other: Direction) -> bool {
        self.opposite() == other
    }
}

/// Body cells ordered tail to head; the head is the last element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snake {
    body: Vec<Cell>,
    heading: Direction,
}

impl Snake {
    pub fn new(head: Cell, size: usize, heading: Direction, cell_size: Coord) -> Self {
        let diff = match &heading {
            Up => (0, -cell_size),
            Down => (0, cell_size),
            Left => (-cell_size, 0),
            Right => (cell_size, 0),
        };

        let body = (0..size as Coord).rev()
            .map(|i| (head.0 - diff.0 * i, head.1 - diff.1 * i))
            .collect();
        Snake { body, heading }
    }

    #[cfg(test)]
    pub fn from_body(body: Vec<Cell>, heading: Direction) -> Self {
        Snake { body, heading }
    }

    pub fn body(&self) -> &[Cell] {
        &self.body
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn head(&self) -> Cell {
        // Never empty: built with at least three cells and the tail is only
        // dropped right after a head was pushed.
        self.body[self.body.len() - 1]
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    /// Turns towards `new_heading` unless it reverses the current heading.
    /// Returns whether the heading changed.
    pub fn set_heading(&mut self, new_heading: Direction) -> bool {
        if new_heading.is_reverse(self.heading) {
            return false;
        }
        self.heading = new_heading;
        true
    }

    pub fn push_head(&mut self, cell: Cell) {
        self.body.push(cell);
    }

    pub fn pop_tail(&mut self) -> Option<Cell> {
        if self.body.is_empty() {
            None
        } else {
            Some(self.body.remove(0))
        }
    }

    pub fn contains(&self, cell: &Cell) -> bool {
        self.body.contains(cell)
    }

    pub fn head_char(&self) -> char {
        match self.heading {
            Up => '^',
            Down => 'v',
            Left => '<',
            Right => '>',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_builds_tail_to_head() {
        let snake = Snake::new((240, 200), 3, Right, 20);
        assert_eq!(snake.body(), &[(200, 200), (220, 200), (240, 200)]);
        assert_eq!(snake.head(), (240, 200));

        let snake = Snake::new((100, 100), 3, Up, 20);
        assert_eq!(snake.body(), &[(100, 140), (100, 120), (100, 100)]);
    }

    #[test]
    fn reverse_heading_is_rejected() {
        let mut snake = Snake::new((240, 200), 3, Right, 20);
        assert!(!snake.set_heading(Left));
        assert_eq!(snake.heading(), Right);

        assert!(snake.set_heading(Up));
        assert!(!snake.set_heading(Down));
        assert!(snake.set_heading(Left));
        assert_eq!(snake.heading(), Left);
    }

    #[test]
    fn opposites() {
        for dir in [Up, Down, Left, Right] {
            assert_eq!(dir.opposite().opposite(), dir);
            assert!(dir.is_reverse(dir.opposite()));
            assert!(!dir.is_reverse(dir));
        }
    }

    #[test]
    fn push_and_pop() {
        let mut snake = Snake::new((240, 200), 3, Right, 20);
        snake.push_head((260, 200));
        assert_eq!(snake.pop_tail(), Some((200, 200)));
        assert_eq!(snake.body(), &[(220, 200), (240, 200), (260, 200)]);
        assert!(snake.contains(&(260, 200)));
    }
}
