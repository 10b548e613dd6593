use super::*;

pub trait TimeExt: Sized {
    fn now() -> Self;
    fn from_second(second: i64) -> Option<Self>;
}

impl TimeExt for metav1::Time {
    /// Create a metav1::Time set to the current UTC time.
    ///
    /// # Examples
    ///
    /// ```
    /// use node_problem_ext::{metav1, TimeExt as _};
    /// let now = metav1::Time::now();
    /// ```
    fn now() -> Self {
        Self(jiff::Timestamp::now())
    }

    /// Create a metav1::Time from whole seconds since the Unix epoch.
    ///
    /// Returns `None` when `second` is outside the supported timestamp range.
    fn from_second(second: i64) -> Option<Self> {
        jiff::Timestamp::from_second(second).ok().map(Self)
    }
}
