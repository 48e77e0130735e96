/// Local wall-clock time formatted as `HH:MM:SS`, used for message and join stamps.
pub fn clock_timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
