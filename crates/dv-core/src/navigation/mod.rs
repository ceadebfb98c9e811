//! Sequential navigation through displayed plots

use crate::plot::PlotId;

/// History of plots shown in interactive mode
#[derive(Debug, Clone, Default)]
pub struct ViewHistory {
    entries: Vec<PlotId>,
    position: Option<usize>,
}

impl ViewHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a displayed plot and make it current
    ///
    /// A plot shown again is not duplicated; the cursor moves to its entry.
    pub fn push(&mut self, id: PlotId) {
        match self.entries.iter().position(|e| *e == id) {
            Some(idx) => self.position = Some(idx),
            None => {
                self.entries.push(id);
                self.position = Some(self.entries.len() - 1);
            }
        }
    }

    /// Currently shown plot
    pub fn current(&self) -> Option<&PlotId> {
        self.position.and_then(|idx| self.entries.get(idx))
    }

    /// Step forward
    pub fn next(&mut self) -> Result<&PlotId, String> {
        let idx = match self.position {
            Some(idx) if idx + 1 < self.entries.len() => idx + 1,
            Some(_) => return Err("Already at the last plot".to_string()),
            None => return Err("No plots have been displayed".to_string()),
        };
        self.position = Some(idx);
        Ok(&self.entries[idx])
    }

    /// Step back
    pub fn previous(&mut self) -> Result<&PlotId, String> {
        let idx = match self.position {
            Some(idx) if idx > 0 => idx - 1,
            Some(_) => return Err("Already at the first plot".to_string()),
            None => return Err("No plots have been displayed".to_string()),
        };
        self.position = Some(idx);
        Ok(&self.entries[idx])
    }

    /// Jump to an entry by index
    pub fn seek(&mut self, idx: usize) -> Result<&PlotId, String> {
        if idx >= self.entries.len() {
            return Err(format!(
                "Position {} out of bounds ({} plots displayed)",
                idx,
                self.entries.len()
            ));
        }
        self.position = Some(idx);
        Ok(&self.entries[idx])
    }

    /// Index of the current entry
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> PlotId {
        PlotId::new("G", "C", name)
    }

    #[test]
    fn test_navigation_through_history() {
        let mut history = ViewHistory::new();
        assert!(history.next().is_err());

        history.push(id("a"));
        history.push(id("b"));
        history.push(id("c"));
        assert_eq!(history.current(), Some(&id("c")));

        assert_eq!(history.previous().unwrap(), &id("b"));
        assert_eq!(history.previous().unwrap(), &id("a"));
        assert!(history.previous().is_err());
        assert_eq!(history.next().unwrap(), &id("b"));
    }

    #[test]
    fn test_redisplay_moves_cursor_without_duplicate() {
        let mut history = ViewHistory::new();
        history.push(id("a"));
        history.push(id("b"));
        history.push(id("a"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.position(), Some(0));
    }

    #[test]
    fn test_seek_bounds() {
        let mut history = ViewHistory::new();
        history.push(id("a"));
        assert!(history.seek(3).is_err());
        assert_eq!(history.seek(0).unwrap(), &id("a"));

        history.clear();
        assert!(history.current().is_none());
    }
}
