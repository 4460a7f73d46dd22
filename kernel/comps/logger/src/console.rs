// SPDX-License-Identifier: MPL-2.0

//! Console sinks and the `print` and `println` macros.

use alloc::{collections::btree_map::BTreeMap, fmt, string::String, sync::Arc, vec::Vec};
use core::fmt::Write;

use spin::{Mutex, MutexGuard};

/// A byte sink that log records and `print!` output are sent to.
pub trait Console: Send + Sync {
    /// Sends the bytes to the console.
    fn send(&self, buf: &[u8]);
}

static CONSOLES: Mutex<BTreeMap<String, Arc<dyn Console>>> = Mutex::new(BTreeMap::new());

/// Registers a console under `name`, replacing any console of the same name.
pub fn register_console(name: &str, console: Arc<dyn Console>) {
    CONSOLES.lock().insert(String::from(name), console);
}

/// Unregisters the console named `name`, returning it if found.
pub fn unregister_console(name: &str) -> Option<Arc<dyn Console>> {
    CONSOLES.lock().remove(name)
}

/// Returns the names of all registered consoles.
pub fn all_console_names() -> Vec<String> {
    CONSOLES.lock().keys().cloned().collect()
}

/// Prints the formatted arguments to all registered consoles.
pub fn _print(args: fmt::Arguments) {
    // Holding the lock for the whole record keeps output from interleaving.
    struct Printer<'a>(MutexGuard<'a, BTreeMap<String, Arc<dyn Console>>>);

    impl Write for Printer<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0
                .values()
                .for_each(|console| console.send(s.as_bytes()));
            Ok(())
        }
    }

    // The printer itself never fails.
    let _ = Printer(CONSOLES.lock()).write_fmt(args);
}

/// Prints to all registered consoles.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {{
        $crate::_print(format_args!($($arg)*));
    }};
}

/// Prints to all registered consoles, with a newline.
#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::_print(format_args!("{}\n", format_args!($($arg)*)));
    }};
}
