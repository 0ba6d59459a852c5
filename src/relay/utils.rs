//! Relay utilities

use std::{future::Future, io, time::Duration};

use tokio::time;

/// Runs the future under an optional deadline, mapping expiry to `TimedOut`
pub async fn try_timeout<T, E, F>(fut: F, timeout: Option<Duration>) -> io::Result<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<io::Error>,
{
    match timeout {
        Some(t) => time::timeout(t, fut)
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))?,
        None => fut.await,
    }
    .map_err(Into::into)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn expires_in_bounded_time() {
        let begin = Instant::now();
        let res: io::Result<()> = try_timeout(
            async {
                time::delay_for(Duration::from_secs(30)).await;
                Ok::<(), io::Error>(())
            },
            Some(Duration::from_millis(50)),
        )
        .await;

        let err = res.expect_err("must time out");
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(begin.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn passes_result_through_without_deadline() {
        let v = try_timeout(async { Ok::<u32, io::Error>(42) }, None).await.unwrap();
        assert_eq!(v, 42);
    }
}
