/// Types whose parametric direction can be flipped.
pub trait Invertible: Clone {
    fn invert(&mut self);

    fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.invert();
        inv
    }
}

/// Types that can be mapped by a transform such as a homogeneous matrix.
pub trait Transformable<T>: Clone {
    fn transform(&mut self, transform: T);

    fn transformed(&self, transform: T) -> Self {
        let mut clone = self.clone();
        clone.transform(transform);
        clone
    }
}
