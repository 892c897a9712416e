//! Arithmetic boilerplate for single-field integer newtypes.

/// Implements an `std::ops` trait for a tuple newtype by delegating to the wrapped value.
///
/// * `binary` implements `Trait<Self, Output = Self>`
/// * `inplace` implements the `*Assign` variant
/// * `unary` implements single-operand traits like `Neg`
#[macro_export]
macro_rules! op {
    (binary $type:ty, $trait:ident, $method:ident) => {
        impl $trait for $type {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(self.0.$method(rhs.0))
            }
        }
    };
    (inplace $type:ty, $trait:ident, $method:ident) => {
        impl $trait for $type {
            fn $method(&mut self, rhs: Self) {
                self.0.$method(rhs.0)
            }
        }
    };
    (unary $type:ty, $trait:ident, $method:ident) => {
        impl $trait for $type {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(self.0.$method())
            }
        }
    };
}
