#[cfg(test)]
mod unit_tests {
    use crate::utils::{duration_millis, format_duration, measure_time, NetworkError};
    use std::time::Duration;

    #[test]
    fn test_format_duration_milliseconds() {
        let duration = Duration::from_millis(500);
        assert_eq!(format_duration(duration), "500ms");
    }

    #[test]
    fn test_format_duration_seconds() {
        let duration = Duration::from_millis(1500);
        assert_eq!(format_duration(duration), "1.50s");
    }

    #[test]
    fn test_duration_millis_keeps_fraction() {
        assert_eq!(duration_millis(Duration::from_millis(40)), 40.0);
        assert_eq!(duration_millis(Duration::from_micros(1500)), 1.5);
    }

    #[test]
    fn test_timeout_error_message() {
        let error = NetworkError::Timeout(Duration::from_secs(3));
        assert_eq!(error.to_string(), "Timed out after 3.00s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: NetworkError = io.into();
        assert!(matches!(error, NetworkError::Io(_)));
        assert_eq!(error.to_string(), "IO error: missing");
    }

    #[tokio::test]
    async fn test_measure_time() {
        let (duration, result) = measure_time(|| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            "test_result"
        })
        .await;

        assert!(duration >= Duration::from_millis(90)); // Allow some margin
        assert!(duration <= Duration::from_millis(500));
        assert_eq!(result, "test_result");
    }
}
