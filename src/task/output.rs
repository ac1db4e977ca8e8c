//! Child process output capture

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Split};
use tokio::process::Child;
use tracing::warn;

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns all collected output lines, interleaved in arrival order. Lines
/// that are not valid UTF-8 are decoded lossily; both pipes are drained
/// until EOF so the child never blocks on a full pipe.
pub(crate) async fn stream_child_output(
    child: &mut Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> Vec<String> {
    let mut stderr_reader = child.stderr.take().map(|s| BufReader::new(s).split(b'\n'));
    let mut stdout_reader = child.stdout.take().map(|s| BufReader::new(s).split(b'\n'));

    let mut all_output = Vec::new();
    let mut stderr_done = stderr_reader.is_none();
    let mut stdout_done = stdout_reader.is_none();

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = next_line(&mut stderr_reader), if !stderr_done => {
                match line {
                    Some(line) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    None => stderr_done = true,
                }
            }
            line = next_line(&mut stdout_reader), if !stdout_done => {
                match line {
                    Some(line) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    None => stdout_done = true,
                }
            }
        }
    }

    all_output
}

/// Next decoded line, or `None` at EOF or on a read error
async fn next_line<R>(reader: &mut Option<Split<BufReader<R>>>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let segments = reader.as_mut()?;
    match segments.next_segment().await {
        Ok(Some(mut bytes)) => {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to read task output: {}", e);
            None
        }
    }
}
