/// Submitted lines in chronological order plus a browse cursor for
/// previous/next recall. `browse == None` means past-the-end (not browsing).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryStore {
    entries: Vec<String>,
    browse: Option<usize>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn browse_index(&self) -> Option<usize> {
        self.browse
    }

    /// Appends without deduplication and stops browsing.
    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
        self.browse = None;
    }

    pub fn extend<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.entries.extend(lines);
        self.browse = None;
    }

    pub fn reset_browse(&mut self) {
        self.browse = None;
    }

    pub fn previous(&mut self) -> &str {
        if self.entries.is_empty() {
            return "";
        }
        let idx = match self.browse {
            None => self.entries.len() - 1,
            Some(idx) => idx.saturating_sub(1),
        };
        self.browse = Some(idx);
        &self.entries[idx]
    }

    pub fn next(&mut self) -> &str {
        let Some(idx) = self.browse else {
            return "";
        };
        if idx + 1 >= self.entries.len() {
            self.browse = None;
            return "";
        }
        self.browse = Some(idx + 1);
        &self.entries[idx + 1]
    }
}
