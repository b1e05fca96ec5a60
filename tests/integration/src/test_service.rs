//! Gateway surface: health, metrics, pass-through, and request rejection.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use ruststack_tpc_core::checksums::DigestAlgorithm;

    use crate::{FakeRemote, Gateway, RemoteObject};

    #[tokio::test]
    async fn test_should_answer_health_check() {
        let gateway = Gateway::start().await;
        let (status, body) = gateway.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"running\""), "{body}");
    }

    #[tokio::test]
    async fn test_should_count_transfers_in_metrics() {
        let remote = FakeRemote::start().await;
        let gateway = Gateway::start().await;
        remote.serve(
            "/files/data",
            RemoteObject::with_digest(b"hello", DigestAlgorithm::Adler32),
        );
        remote.serve("/files/denied", RemoteObject::status(StatusCode::FORBIDDEN));

        gateway
            .copy("/sa1/data", &[("Source", remote.url("/files/data").as_str())])
            .await;
        gateway
            .copy("/sa1/denied", &[("Source", remote.url("/files/denied").as_str())])
            .await;

        let (status, body) = gateway.get("/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            body.contains("tpc_transfer_duration_seconds_count{direction=\"pull\"} 2"),
            "{body}"
        );
        assert!(
            body.contains("tpc_transfer_failures_total{direction=\"pull\"} 1"),
            "{body}"
        );
        assert!(
            body.contains("tpc_transfer_duration_seconds_count{direction=\"push\"} 0"),
            "{body}"
        );
    }

    #[tokio::test]
    async fn test_should_pass_local_copy_to_continuation() {
        let gateway = Gateway::start().await;
        std::fs::write(gateway.file("data"), b"hello").expect("write");

        let (status, headers, _) = gateway
            .copy("/sa1/data", &[("Destination", "/sa1/copy")])
            .await;

        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(
            headers.get("server").and_then(|v| v.to_str().ok()),
            Some("RustStackTPC")
        );
    }

    #[tokio::test]
    async fn test_should_reject_ambiguous_and_misplaced_requests() {
        let remote = FakeRemote::start().await;
        let gateway = Gateway::start().await;

        let (status, headers, body) = gateway
            .copy(
                "/sa1/data",
                &[
                    ("Source", remote.url("/a").as_str()),
                    ("Destination", remote.url("/b").as_str()),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Source and Destination headers are both present!");
        assert!(headers.contains_key("x-request-id"));

        let (status, _, body) = gateway
            .copy("/sa1/no/such/dir/data", &[("Source", remote.url("/a").as_str())])
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, "Parent resource does not exist");

        let (status, _, body) = gateway
            .copy("/sa1/data", &[("Source", "ftp://example.org/data")])
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid Source header: ftp://example.org/data");

        assert!(remote.requests().is_empty());
    }
}
