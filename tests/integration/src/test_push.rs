//! Push transfers: `COPY` with a remote `Destination`.

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use crate::{FakeRemote, Gateway};

    #[tokio::test]
    async fn test_should_push_local_file() {
        let remote = FakeRemote::start().await;
        let gateway = Gateway::start().await;
        std::fs::write(gateway.file("report.csv"), b"a,b,c\n1,2,3\n").expect("write");

        let (status, _, body) = gateway
            .copy(
                "/sa1/report.csv",
                &[
                    ("Destination", remote.url("/upload/report.csv").as_str()),
                    ("TransferHeaderAuthorization", "Bearer X"),
                ],
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "{body}");
        let requests = remote.requests();
        assert_eq!(requests.len(), 1);
        let put = &requests[0];
        assert_eq!(put.method, Method::PUT);
        assert_eq!(put.path, "/upload/report.csv");
        assert_eq!(put.body.as_ref(), b"a,b,c\n1,2,3\n");
        assert_eq!(
            put.headers.get("content-length").and_then(|v| v.to_str().ok()),
            Some("12")
        );
        assert_eq!(
            put.headers.get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer X")
        );
    }

    #[tokio::test]
    async fn test_should_report_rejected_push() {
        let remote = FakeRemote::start().await;
        let gateway = Gateway::start().await;
        remote.fail_puts(StatusCode::FORBIDDEN);
        std::fs::write(gateway.file("data"), b"hello").expect("write");

        let (status, _, body) = gateway
            .copy("/sa1/data", &[("Destination", remote.url("/upload/data").as_str())])
            .await;

        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(body, "Third party transfer error: 403 Forbidden");
    }

    #[tokio::test]
    async fn test_should_fail_push_of_missing_file() {
        let remote = FakeRemote::start().await;
        let gateway = Gateway::start().await;

        let (status, _, body) = gateway
            .copy("/sa1/absent", &[("Destination", remote.url("/upload/absent").as_str())])
            .await;

        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert!(body.starts_with("Local I/O error on /sa1/absent"), "{body}");
        assert!(remote.requests().is_empty());
    }

    #[tokio::test]
    async fn test_should_refuse_to_push_directory() {
        let remote = FakeRemote::start().await;
        let gateway = Gateway::start().await;
        std::fs::create_dir(gateway.file("dir")).expect("mkdir");

        let (status, _, body) = gateway
            .copy("/sa1/dir", &[("Destination", remote.url("/upload/dir").as_str())])
            .await;

        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(body, "Not a regular file: /sa1/dir");
        assert!(remote.requests().is_empty());
    }
}
