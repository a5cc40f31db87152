use crate::document::Document;

/// Materialized result cursor.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    docs: Vec<Document>,
    pos: usize,
}

impl Cursor {
    #[must_use]
    pub(crate) fn new(docs: Vec<Document>) -> Self {
        Self { docs, pos: 0 }
    }

    pub fn advance(&mut self) -> Option<Document> {
        let d = self.docs.get(self.pos).cloned()?;
        self.pos += 1;
        Some(d)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[must_use]
    pub fn to_vec(self) -> Vec<Document> {
        self.docs
    }
}

impl Iterator for Cursor {
    type Item = Document;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
