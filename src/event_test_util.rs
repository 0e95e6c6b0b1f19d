use std::fmt::Write as _;
use std::{cell::RefCell, collections::HashSet};

thread_local! {
    /// A buffer for recording internal events emitted by a single test.
    static EVENTS_RECORDED: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Returns Ok(()) if the event name pattern is matched only once.
///
/// # Errors
///
/// Will return `Err` if `pattern` is not found in the event record, or is found multiple times.
pub fn contains_name_once(pattern: &str) -> Result<(), String> {
    EVENTS_RECORDED.with(|events| {
        let mut n_events = 0;
        let mut names = String::new();
        for event in &*events.borrow() {
            if event.ends_with(pattern) {
                if n_events > 0 {
                    names.push_str(", ");
                }
                n_events += 1;
                _ = write!(names, "`{event}`");
            }
        }
        if n_events == 0 {
            Err(format!("Missing event `{pattern}`"))
        } else if n_events > 1 {
            Err(format!(
                "Multiple ({n_events}) events matching `{pattern}`: ({names})."
            ))
        } else {
            Ok(())
        }
    })
}

/// Returns true if no event whose name ends with `pattern` was recorded.
pub fn not_contains_name(pattern: &str) -> bool {
    EVENTS_RECORDED.with(|events| !events.borrow().iter().any(|e| e.ends_with(pattern)))
}

pub fn clear_recorded_events() {
    EVENTS_RECORDED.with(|er| er.borrow_mut().clear());
}

/// Record an emitted internal event by name. Only called by the test build of
/// `emit!`.
pub fn record_internal_event(event: &str) {
    EVENTS_RECORDED.with(|er| er.borrow_mut().insert(event.trim().into()));
}
