pub use string_cache::DefaultAtom as Atom;

/// Image names seen in one session, indexed in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct ImageNames {
    names: Vec<Atom>,
}

impl ImageNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name and return its index
    pub fn intern(&mut self, s: &str) -> usize {
        let atom = Atom::from(s);
        match self.names.iter().position(|a| *a == atom) {
            Some(idx) => idx,
            None => {
                self.names.push(atom);
                self.names.len() - 1
            }
        }
    }

    pub fn atom(&mut self, s: &str) -> Atom {
        let idx = self.intern(s);
        self.names[idx].clone()
    }

    pub fn index_of(&self, s: &str) -> Option<usize> {
        self.names.iter().position(|a| &**a == s)
    }

    /// Current count of unique names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Atom> {
        self.names.get(id)
    }
}
