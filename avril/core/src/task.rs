//! Task abstraction for the cooperative scheduler

/// A unit of deferred work
///
/// Any movable type callable with no arguments qualifies; closures get
/// the trait for free through the blanket impl.
pub trait Task {
    /// Run the task to completion
    ///
    /// Invoked by the scheduler with interrupts enabled, so the body
    /// must tolerate ISR interleavings.
    fn run(&mut self);
}

impl<F: FnMut()> Task for F {
    fn run(&mut self) {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_tasks() {
        let mut hits = 0u8;
        {
            let mut task = || hits += 1;
            task.run();
            task.run();
        }
        assert_eq!(hits, 2);
    }
}
