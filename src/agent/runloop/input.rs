use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc;

const LINE_BUFFER: usize = 8;

/// Lines read on a dedicated OS thread.
///
/// A blocking read cannot be cancelled, so it must not live on the runtime's
/// blocking pool: shutting the runtime down would wait for the next Enter.
/// The channel closes at end of input; the thread exits on the next line
/// after the receiver is dropped, or with the process.
pub(crate) fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    thread::Builder::new()
        .name("memchat-stdin".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}
