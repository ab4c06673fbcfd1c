use log::debug;

/// Reports fractional progress (0..=100) and a status line to the host. The
/// host refreshes its UI from inside the callback, so long loops call
/// [`Progress::report`] regularly.
pub struct Progress<'a> {
    callback: Box<dyn FnMut(u8, &str) + 'a>,
}

impl<'a> Progress<'a> {
    pub fn new(callback: impl FnMut(u8, &str) + 'a) -> Self {
        Progress {
            callback: Box::new(callback),
        }
    }

    /// A reporter with no host attached; progress only goes to the log.
    pub fn silent() -> Self {
        Progress::new(|_, _| ())
    }

    pub fn report(&mut self, percent: u8, status: &str) {
        let percent = percent.min(100);
        debug!(percent = percent, status = status; "Progress");
        (self.callback)(percent, status);
    }

    /// Reports step `index` of `count` mapped onto the `from..to` percent range.
    pub fn report_step(&mut self, from: u8, to: u8, index: usize, count: usize, status: &str) {
        let span = f64::from(to.saturating_sub(from));
        let fraction = if count == 0 { 1.0 } else { index as f64 / count as f64 };
        self.report(from + (span * fraction) as u8, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_mapped_onto_the_range() {
        let mut seen = Vec::new();
        {
            let mut progress = Progress::new(|p, _| seen.push(p));
            progress.report_step(50, 100, 0, 4, "x");
            progress.report_step(50, 100, 2, 4, "x");
            progress.report_step(0, 50, 3, 0, "x");
            progress.report(150, "x");
        }
        assert_eq!(seen, vec![50, 75, 50, 100]);
    }
}
