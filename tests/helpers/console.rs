//! A console that keeps everything written to it.

use escalog::Console;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct CapturingConsole {
    pub out: Mutex<Vec<String>>,
    pub err: Mutex<Vec<String>>,
}

impl CapturingConsole {
    pub fn out_lines(&self) -> Vec<String> {
        self.out.lock().unwrap().clone()
    }

    pub fn err_lines(&self) -> Vec<String> {
        self.err.lock().unwrap().clone()
    }

    /// Critical records printed for failures of the logger itself.
    pub fn meta_errors(&self) -> Vec<String> {
        self.err_lines()
            .into_iter()
            .filter(|line| line.contains("*CRITICAL*"))
            .collect()
    }
}

impl Console for CapturingConsole {
    fn out(&self, text: &str) {
        self.out.lock().unwrap().push(text.to_string());
    }

    fn err(&self, text: &str) {
        self.err.lock().unwrap().push(text.to_string());
    }
}
