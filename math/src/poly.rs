/// Dense coefficient (or evaluation) vector of a ring element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poly<O>(pub Vec<O>);

impl<O: Clone + Default> Poly<O> {
    pub fn new(n: usize) -> Self {
        Self(vec![O::default(); n])
    }

    pub fn from_vec(values: Vec<O>) -> Self {
        Self(values)
    }

    pub fn n(&self) -> usize {
        self.0.len()
    }

    pub fn set_all(&mut self, v: &O) {
        self.0.fill(v.clone())
    }

    pub fn zero(&mut self) {
        self.set_all(&O::default())
    }

    pub fn resize(&mut self, n: usize) {
        self.0.resize(n, O::default());
    }

    pub fn copy_from(&mut self, other: &Poly<O>) {
        if std::ptr::eq(self, other) {
            return;
        }
        self.resize(other.n());
        self.0.clone_from_slice(&other.0)
    }
}
