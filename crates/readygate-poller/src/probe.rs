//! Probe primitives.
//!
//! `Probe` is the seam between the retry loop and the network: the
//! session loop only sees classified `AttemptOutcome`s, so tests can
//! script a probe and a TLS-capable prober can be dropped in without
//! touching the loop.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use readygate_core::{AttemptOutcome, TargetAddr};

/// One network probe against a target, bounded by `timeout`.
pub trait Probe: Send + Sync {
    fn probe(
        &self,
        target: &TargetAddr,
        timeout: Duration,
    ) -> impl Future<Output = AttemptOutcome> + Send;
}

/// HTTP/1.1 prober: one GET per attempt over a fresh TCP connection.
///
/// A fresh connection per attempt is deliberate: a deployment that is
/// still coming up may accept and then drop connections, and reusing
/// one would mask that.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProbe;

impl Probe for HttpProbe {
    async fn probe(&self, target: &TargetAddr, timeout: Duration) -> AttemptOutcome {
        http_probe(target, timeout).await
    }
}

/// Issue a single GET and classify the result.
///
/// Any response, whatever its status, classifies as `Responded`; the
/// success policy is applied by the caller. Timeouts and transport
/// failures classify as `TimedOut` / `NetworkError`.
async fn http_probe(target: &TargetAddr, timeout: Duration) -> AttemptOutcome {
    let result = tokio::time::timeout(timeout, async {
        // DNS resolution happens inside connect; a not-yet-propagated
        // name surfaces as a NetworkError like any other failure.
        let stream = match tokio::net::TcpStream::connect(&target.authority).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, authority = %target.authority, "probe connection failed");
                return AttemptOutcome::NetworkError(e.to_string());
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, authority = %target.authority, "probe handshake failed");
                return AttemptOutcome::NetworkError(e.to_string());
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(target.path.as_str())
            .header("host", target.host.as_str())
            .header("user-agent", "readygate/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => return AttemptOutcome::NetworkError(e.to_string()),
        };

        match sender.send_request(req).await {
            Ok(resp) => AttemptOutcome::Responded(resp.status().as_u16()),
            Err(e) => {
                debug!(error = %e, authority = %target.authority, "probe request failed");
                AttemptOutcome::NetworkError(e.to_string())
            }
        }
    })
    .await;

    match result {
        Ok(outcome) => outcome,
        Err(_) => {
            debug!(authority = %target.authority, "probe timed out");
            AttemptOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let body = format!("{status_line}\r\ncontent-length: 2\r\n\r\nok");
            let _ = stream.write_all(body.as_bytes()).await;
        });
        format!("{addr}")
    }

    fn target(authority: &str) -> TargetAddr {
        TargetAddr {
            authority: authority.to_string(),
            host: authority.split(':').next().unwrap().to_string(),
            path: "/healthz".to_string(),
        }
    }

    #[tokio::test]
    async fn probe_classifies_200_as_responded() {
        let authority = serve_once("HTTP/1.1 200 OK").await;
        let outcome = HttpProbe.probe(&target(&authority), Duration::from_secs(1)).await;
        assert_eq!(outcome, AttemptOutcome::Responded(200));
    }

    #[tokio::test]
    async fn probe_classifies_503_as_responded_not_error() {
        let authority = serve_once("HTTP/1.1 503 Service Unavailable").await;
        let outcome = HttpProbe.probe(&target(&authority), Duration::from_secs(1)).await;
        assert_eq!(outcome, AttemptOutcome::Responded(503));
    }

    #[tokio::test]
    async fn probe_to_closed_port_is_network_error() {
        // Port 1 won't be listening.
        let outcome = HttpProbe
            .probe(&target("127.0.0.1:1"), Duration::from_millis(500))
            .await;
        assert!(matches!(outcome, AttemptOutcome::NetworkError(_)));
    }

    #[tokio::test]
    async fn probe_times_out_on_silent_server() {
        // Accept the connection but never respond.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let outcome = HttpProbe
            .probe(&target(&format!("{addr}")), Duration::from_millis(100))
            .await;
        assert_eq!(outcome, AttemptOutcome::TimedOut);
    }
}
