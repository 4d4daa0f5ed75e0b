/// Which interior the player is in: an outer area and at most one nested level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubAreaStack {
    outer: Option<String>,
    nested: Option<String>,
}

impl SubAreaStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an area. Fails when both levels are occupied.
    pub fn enter(&mut self, area: impl Into<String>) -> bool {
        if self.outer.is_none() {
            self.outer = Some(area.into());
            true
        } else if self.nested.is_none() {
            self.nested = Some(area.into());
            true
        } else {
            false
        }
    }

    /// Pop the innermost area.
    pub fn exit(&mut self) -> Option<String> {
        self.nested.take().or_else(|| self.outer.take())
    }

    /// Innermost active area.
    pub fn current(&self) -> Option<&str> {
        self.nested.as_deref().or(self.outer.as_deref())
    }

    pub fn outer(&self) -> Option<&str> {
        self.outer.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.outer.is_some() as usize + self.nested.is_some() as usize
    }

    pub fn clear(&mut self) {
        self.outer = None;
        self.nested = None;
    }
}
