pub mod anonymize;
pub mod model;
pub mod terms;

use std::io::Write;

/// Progress line on stderr, redrawn in place and closed at completion.
pub fn progress_printer() -> impl Fn(f64, &str) + Send + Sync + 'static {
    move |fraction: f64, message: &str| {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K{:>5.1}%  {}", fraction * 100.0, message);
        if fraction >= 1.0 {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}
