//! Serves the dispatch protocol on a single client connection.
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::error::QueueError;
use crate::line_reader::{LineReader, ReadLineError};
use crate::parser::ParsingError;
use crate::queue::JobQueue;
use crate::types::job::Job;
use crate::types::protocol::{Command, Response};
use crate::types::serialisable::WireSerialisable;
use crate::util::bytes_to_human_str;

/// Applies a command to `queue`, returning the response to send back, or
/// `None` if the connection should be closed.
pub fn execute<Q: JobQueue + ?Sized>(queue: &Q, cmd: Command) -> Option<Response> {
    use Command::*;

    let res = match cmd {
        Enqueue { job_type } => queue
            .enqueue(Job::new(job_type))
            .map(|id| Response::Inserted { id }),
        Dequeue { consumer } => queue
            .dequeue(&consumer)
            .map(|job| Response::Reserved { job }),
        Conclude { id, consumer } => queue
            .conclude(id, &consumer)
            .map(|()| Response::Concluded),
        Cancel { id } => queue.cancel(id).map(|()| Response::Cancelled),
        Status { id } => queue.fetch_job(id).map(|job| Response::Found { job }),
        Quit => return None,
    };

    Some(match res {
        Ok(resp) => resp,
        Err(error @ (QueueError::IdInUse { .. } | QueueError::IdsExhausted)) => {
            error!(%error, "unable to assign a job id");
            error.into()
        },
        Err(error) => {
            debug!(%error, "command refused");
            error.into()
        },
    })
}

/// Reads commands from `conn` and writes back their responses until the client
/// quits, disconnects, or `cancel` fires.
///
/// Responses are written in request order, so pipelined requests get a
/// pipelined reply. A line longer than `max_line_len` is answered with
/// `BAD_FORMAT` and ends the connection.
pub async fn handle_conn<Q, S>(
    cancel: CancellationToken,
    conn: &mut S,
    queue: &Q,
    max_line_len: usize,
) -> io::Result<()>
where
    Q: JobQueue + ?Sized,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (r, mut w) = tokio::io::split(conn);
    let mut r = LineReader::new(r, max_line_len);

    loop {
        let line = select! {
            x = r.read_line() => match x {
                Ok(Some(x)) => x,
                Ok(None) => return Ok(()),
                Err(ReadLineError::TooLong { max }) => {
                    debug!(max, "line too long, closing connection");
                    let resp = ParsingError::BadFormat.serialise_wire();
                    select! {
                        x = w.write_all(&resp) => x?,
                        _ = cancel.cancelled() => return Ok(()),
                    };
                    return Ok(());
                },
                Err(ReadLineError::Io(error)) => return Err(error),
            },
            _ = cancel.cancelled() => return Ok(()),
        };

        trace!(line = bytes_to_human_str(&line), "processing command");

        let resp = match Command::try_from(&line as &[u8]) {
            Ok(cmd) => match execute(queue, cmd) {
                Some(resp) => resp.serialise_wire(),
                None => return Ok(()),
            },
            Err(error) => {
                debug!(%error, "unparseable command");
                error.serialise_wire()
            },
        };

        // Racing every write against cancellation keeps shutdown prompt even
        // when a client stops reading.
        select! {
            x = w.write_all(&resp) => x?,
            _ = cancel.cancelled() => return Ok(()),
        };

        select! {
            x = w.flush() => x?,
            _ = cancel.cancelled() => return Ok(()),
        };
    }
}
