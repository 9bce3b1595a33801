//! All-or-nothing event listener registration.

/// Registers one listener per event with `add`.
///
/// When any registration fails, the listeners already registered are
/// removed again with `remove`, newest first, and the error is returned.
pub(crate) fn register_all<L, E>(
	events: &[&'static str],
	mut add: impl FnMut(&'static str) -> Result<L, E>,
	mut remove: impl FnMut(&'static str, &L),
) -> Result<Vec<(&'static str, L)>, E> {
	let mut registered = Vec::with_capacity(events.len());
	for &event in events {
		match add(event) {
			Ok(listener) => registered.push((event, listener)),
			Err(error) => {
				for (event, listener) in registered.iter().rev() {
					remove(event, listener);
				}
				return Err(error);
			}
		}
	}
	Ok(registered)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::RefCell;

	#[rstest]
	fn test_registers_every_event() {
		let registered = register_all(&["popstate", "hashchange"], |e| Ok::<_, ()>(e.len()), |_, _| {})
			.unwrap();

		assert_eq!(registered, vec![("popstate", 8), ("hashchange", 10)]);
	}

	#[rstest]
	fn test_failure_unregisters_earlier_listeners() {
		let live = RefCell::new(Vec::new());

		let result = register_all(
			&["popstate", "hashchange"],
			|event| {
				if event == "hashchange" {
					return Err("blocked");
				}
				live.borrow_mut().push(event);
				Ok(event)
			},
			|event, _| live.borrow_mut().retain(|e| *e != event),
		);

		assert_eq!(result, Err("blocked"));
		assert!(live.borrow().is_empty());
	}
}
