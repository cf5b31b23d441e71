use bytes::Bytes;
use igreja_site::{
    AppError,
    storage::{
        LocalUploadStore, MockUploadStore, UploadStore, ext_from_mime, write_or_discard,
    },
};

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n";

#[test]
fn test_ext_from_mime() {
    assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
    assert_eq!(ext_from_mime("image/png"), Some("png"));
    assert_eq!(ext_from_mime("image/gif"), Some("gif"));
    assert_eq!(ext_from_mime("image/webp"), Some("webp"));
    assert_eq!(ext_from_mime("image/svg+xml"), None);
    assert_eq!(ext_from_mime("text/plain"), None);
}

#[cfg(test)]
mod local_store_tests {
    use super::*;
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
    };
    use tokio::io::AsyncWrite;

    #[tokio::test]
    async fn test_put_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path().join("uploads"));

        let url = store
            .put(Bytes::from_static(PNG_HEADER), "image/png")
            .await
            .unwrap();

        assert!(url.starts_with("/uploads/"), "{url}");
        assert!(url.ends_with(".png"), "{url}");
        let file_name = url.trim_start_matches("/uploads/");
        let written = std::fs::read(store.dir().join(file_name)).unwrap();
        assert_eq!(written, PNG_HEADER);
    }

    #[tokio::test]
    async fn test_put_generates_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path());

        let first = store.put(Bytes::from_static(b"a"), "image/gif").await.unwrap();
        let second = store.put(Bytes::from_static(b"b"), "image/gif").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_put_rejects_unsupported_type_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path().join("uploads"));

        let err = store
            .put(Bytes::from_static(b"hello"), "text/plain")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedMediaType(ref mime) if mime == "text/plain"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("public").join("uploads");
        let store = LocalUploadStore::new(&upload_dir);

        let images = store.list().await.unwrap();

        assert!(images.is_empty());
        assert!(upload_dir.is_dir());
    }

    #[tokio::test]
    async fn test_list_only_returns_images() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPEG", "a.webp", "notes.txt", "c.jpg", "no_extension"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();
        let store = LocalUploadStore::new(dir.path());

        let images = store.list().await.unwrap();

        assert_eq!(images, ["/uploads/a.webp", "/uploads/b.JPEG", "/uploads/c.jpg"]);
    }

    /// Writer that fails every write, standing in for a full disk.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::other("disk full")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.png");
        std::fs::write(&path, b"\x89P").unwrap();
        let store = LocalUploadStore::new(dir.path());

        let err = write_or_discard(&path, FullDisk, PNG_HEADER)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)), "{err:?}");
        assert!(!path.exists());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_write_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whole.png");
        let file = tokio::fs::File::create(&path).await.unwrap();

        write_or_discard(&path, file, PNG_HEADER).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), PNG_HEADER);
    }
}

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockUploadStore::new();

        let url = mock
            .put(Bytes::from_static(PNG_HEADER), "image/png")
            .await
            .unwrap();

        assert!(url.starts_with("/uploads/") && url.ends_with(".png"));
        assert_eq!(mock.list().await.unwrap(), vec![url]);
        assert_eq!(mock.stored()[0].1, Bytes::from_static(PNG_HEADER));
    }

    #[tokio::test]
    async fn test_mock_applies_mime_rule() {
        let mock = MockUploadStore::new();

        let result = mock.put(Bytes::from_static(b"%PDF"), "application/pdf").await;

        assert!(matches!(result, Err(AppError::UnsupportedMediaType(_))));
        assert!(mock.stored().is_empty());
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockUploadStore::new_failing();

        let result = mock.put(Bytes::from_static(PNG_HEADER), "image/png").await;

        assert!(matches!(result, Err(AppError::Storage(_))));
    }
}
