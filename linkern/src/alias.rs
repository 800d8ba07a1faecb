//! Aliasing-safety layer
//!
//! `&mut result` can never overlap `&self` or `&other`, so aliasing only
//! arises through the in-place methods. Those name their right-hand side
//! with [`Operand`]; `Operand::This` means "the receiver itself". Kernels
//! that cannot run in place compute into a fresh temporary of the same
//! kind and size, which then replaces the receiver.

use linkern_core::Result;
use tracing::trace;

/// Right-hand side of an in-place operation
#[derive(Debug)]
pub enum Operand<'a, S> {
    /// The receiver of the in-place call
    This,
    /// A distinct value
    Other(&'a S),
}

impl<S> Clone for Operand<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Operand<'_, S> {}

impl<'a, S> From<&'a S> for Operand<'a, S> {
    fn from(other: &'a S) -> Self {
        Operand::Other(other)
    }
}

impl<'a, S> Operand<'a, S> {
    /// Resolve to a reference, substituting `this` for [`Operand::This`]
    pub fn resolve<'b>(self, this: &'b S) -> &'b S
    where
        'a: 'b,
    {
        match self {
            Operand::This => this,
            Operand::Other(other) => other,
        }
    }

    /// Whether this operand names the receiver itself
    pub fn is_this(&self) -> bool {
        matches!(self, Operand::This)
    }
}

/// Compute `operation` into a temporary, then move it over `target`
///
/// `target` is only replaced when `compute` succeeds.
pub(crate) fn through_temporary<S>(
    target: &mut S,
    operation: &'static str,
    compute: impl FnOnce(&S) -> Result<S>,
) -> Result<()> {
    let temporary = compute(target)?;
    trace!(operation, "in-place result routed through a temporary");
    *target = temporary;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_resolve() {
        let this = 1;
        let other = 2;
        assert_eq!(*Operand::This.resolve(&this), 1);
        assert_eq!(*Operand::from(&other).resolve(&this), 2);
        assert!(Operand::<i32>::This.is_this());
    }

    #[test]
    fn test_temporary_replaces_only_on_success() {
        let mut value = vec![1, 2];
        through_temporary(&mut value, "double", |v| Ok(v.iter().map(|x| x * 2).collect()))
            .unwrap();
        assert_eq!(value, vec![2, 4]);

        let result = through_temporary(&mut value, "fail", |_| {
            Err(linkern_core::LinalgError::Singular { index: 0 })
        });
        assert!(result.is_err());
        assert_eq!(value, vec![2, 4]);
    }
}
