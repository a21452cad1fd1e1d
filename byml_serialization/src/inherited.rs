/// A property that may be set at this level of an inheritance chain or left
/// for an ancestor to provide.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inherited<T> {
    pub present: bool,
    pub value: T,
}

impl<T> Inherited<T> {
    pub fn new(value: T) -> Self {
        Self {
            present: true,
            value,
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.present.then_some(&self.value)
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.present = true;
    }
}

impl<T: Default> Inherited<T> {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.present = false;
        self.value = T::default();
    }
}
