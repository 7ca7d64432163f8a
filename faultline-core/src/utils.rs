use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data of a poisoned lock.
///
/// All shared state in this crate stays consistent across a panic, so a
/// poisoned lock must not take the host application down with it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Extracts the message of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "Box<Any>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = panic::catch_unwind(|| panic!("{} {}", "formatted", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 1");

        let payload = panic::catch_unwind(|| panic::panic_any(42)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "Box<Any>");
    }

    #[test]
    fn test_lock_recovers_from_poison() {
        let mutex = std::sync::Arc::new(Mutex::new(1));
        let cloned = mutex.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(mutex.is_poisoned());
        assert_eq!(*lock(&mutex), 1);
    }
}
