//! One-shot schedule: fires its target instant exactly once, then never
//! again.

use std::sync::Mutex;

use crate::civil::Instant;
use crate::schedule::Schedule;

pub struct At {
    target: Mutex<Option<Instant>>,
}

impl At {
    pub fn new(instant: Instant) -> Self {
        At {
            target: Mutex::new(Some(instant)),
        }
    }
}

impl Schedule for At {
    fn next(&self, _last: Instant) -> Option<Instant> {
        self.target.lock().expect("at-schedule lock poisoned").take()
    }
}
