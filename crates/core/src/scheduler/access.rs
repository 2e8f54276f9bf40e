use std::cell::Cell;

/// Privilege level of the current batch.
///
/// Hits run without privileges; scheduled maintenance is executed while a
/// [`SuperUserGuard`] is alive.
#[derive(Debug, Default)]
pub struct Access {
    superuser: Cell<bool>,
}

impl Access {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_superuser(&self) -> bool {
        self.superuser.get()
    }

    /// Raise to super user until the returned guard is dropped.
    pub fn elevate(&self) -> SuperUserGuard<'_> {
        let previous = self.superuser.replace(true);
        SuperUserGuard {
            access: self,
            previous,
        }
    }
}

/// Restores the previous privilege level on drop, including on early return
/// or unwinding.
#[must_use = "privileges are restored as soon as the guard is dropped"]
pub struct SuperUserGuard<'a> {
    access: &'a Access,
    previous: bool,
}

impl Drop for SuperUserGuard<'_> {
    fn drop(&mut self) {
        self.access.superuser.set(self.previous);
    }
}
