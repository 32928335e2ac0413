//! Cancellable, idle-bounded reads from an [`EventStream`].

use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::{Instant, Sleep};

use super::EventStream;
use crate::cancel::CancellationToken;
use crate::error::{CourierError, Result};
use crate::types::StreamEvent;

/// Races every read against the turn's token and an idle deadline.
///
/// `next` yields `Ok(None)` once the stream is exhausted, `Err(Cancelled)` when the
/// token fires, and `Err(Timeout)` when no event arrived within the idle window.
pub struct EventReader<'s> {
    stream: &'s mut EventStream,
    token: CancellationToken,
    idle_timeout: Option<Duration>,
    idle_sleep: Option<Pin<Box<Sleep>>>,
}

impl<'s> EventReader<'s> {
    pub fn new(
        stream: &'s mut EventStream,
        token: &CancellationToken,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            stream,
            token: token.clone(),
            idle_timeout,
            idle_sleep: idle_timeout.map(|d| Box::pin(tokio::time::sleep(d))),
        }
    }

    pub async fn next(&mut self) -> Result<Option<StreamEvent>> {
        let item = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(CourierError::Cancelled),
            _ = idle(&mut self.idle_sleep) => {
                let ms = self.idle_timeout.map_or(0, |d| d.as_millis() as u64);
                return Err(CourierError::Timeout(ms));
            }
            item = self.stream.next() => item,
        };

        if let (Some(sleep), Some(d)) = (self.idle_sleep.as_mut(), self.idle_timeout) {
            sleep.as_mut().reset(Instant::now() + d);
        }
        item.transpose()
    }
}

async fn idle(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_stream() -> EventStream {
        Box::pin(futures::stream::pending())
    }

    #[tokio::test(start_paused = true)]
    async fn idle_window_elapses() {
        let mut stream = pending_stream();
        let token = CancellationToken::new();
        let mut reader = EventReader::new(&mut stream, &token, Some(Duration::from_millis(50)));

        let err = reader.next().await.unwrap_err();
        assert!(matches!(err, CourierError::Timeout(50)));
    }

    #[tokio::test]
    async fn cancellation_wins_over_pending_read() {
        let mut stream = pending_stream();
        let token = CancellationToken::new();
        let mut reader = EventReader::new(&mut stream, &token, None);

        let canceller = token.clone();
        tokio::spawn(async move { canceller.cancel() });

        assert!(reader.next().await.unwrap_err().is_cancellation());
    }

    #[tokio::test]
    async fn exhausted_stream_yields_none() {
        let mut stream: EventStream =
            Box::pin(futures::stream::iter(vec![Ok(StreamEvent::StreamEnd)]));
        let token = CancellationToken::new();
        let mut reader = EventReader::new(&mut stream, &token, None);

        assert_eq!(reader.next().await.unwrap(), Some(StreamEvent::StreamEnd));
        assert_eq!(reader.next().await.unwrap(), None);
    }
}
