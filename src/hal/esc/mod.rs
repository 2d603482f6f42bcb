mod rcesc;
pub use rcesc::{Builder, RCESC};

/// Electronic speed controller
pub trait ESC {
    /// Arm this ESC.
    fn arm(&mut self);

    /// Output a motor speed in `0..=180`.
    fn output(&mut self, speed: u8);
}

impl<T> ESC for &mut T
where
    T: ESC + ?Sized,
{
    fn arm(&mut self) {
        (**self).arm()
    }

    fn output(&mut self, speed: u8) {
        (**self).output(speed)
    }
}
