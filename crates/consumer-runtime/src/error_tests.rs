//! Tests for error types.

use super::*;
use std::error::Error as _;

mod queue_error {
    use super::*;

    /// Verify the transient classification of each variant.
    #[test]
    fn test_is_transient() {
        assert!(!QueueError::QueueNotFound {
            queue: "orders".to_string()
        }
        .is_transient());
        assert!(!QueueError::MessageNotFound {
            receipt: "receipt-1".to_string()
        }
        .is_transient());
        assert!(QueueError::ConnectionFailed {
            message: "reset".to_string()
        }
        .is_transient());
        assert!(QueueError::Timeout {
            duration: Duration::from_secs(30)
        }
        .is_transient());
        assert!(QueueError::Provider {
            code: "503".to_string(),
            message: "throttled".to_string()
        }
        .is_transient());
        assert!(!QueueError::Cancelled.is_transient());
    }

    /// Verify display formatting includes the variant context.
    #[test]
    fn test_display() {
        let error = QueueError::MessageNotFound {
            receipt: "receipt-7".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Message not found or receipt expired: receipt-7"
        );
    }
}

mod handler_error {
    use super::*;

    /// Verify the retry constructor carries its delay.
    #[test]
    fn test_retry_after() {
        let error = HandlerError::retry_after(Duration::from_secs(2520));

        assert!(matches!(
            error,
            HandlerError::Retry { delay } if delay == Duration::from_secs(2520)
        ));
    }

    /// Verify the fatal constructor wraps arbitrary errors.
    #[test]
    fn test_fatal_wraps_error() {
        let error = HandlerError::fatal(anyhow::anyhow!("database unavailable"));

        assert!(matches!(error, HandlerError::Fatal(_)));
        assert_eq!(error.to_string(), "database unavailable");
    }

    /// Verify the retry variant renders its delay.
    #[test]
    fn test_retry_display() {
        let error = HandlerError::retry_after(Duration::from_secs(60));

        assert_eq!(error.to_string(), "Handler requested retry in 60s");
    }
}

mod consume_error {
    use super::*;

    /// Verify partial progress is preserved on the error.
    #[test]
    fn test_carries_consumed_count() {
        let error = ConsumeError::new(
            5,
            ConsumeErrorKind::Receive(QueueError::ConnectionFailed {
                message: "reset".to_string(),
            }),
        );

        assert_eq!(error.consumed(), 5);
        assert!(matches!(error.kind(), ConsumeErrorKind::Receive(_)));
    }

    /// Verify the cause is reachable through the standard error chain.
    #[test]
    fn test_source_chain() {
        let error = ConsumeError::new(0, ConsumeErrorKind::Cancelled);

        let source = error.source().expect("cause should be chained");
        assert_eq!(source.to_string(), "Consumption cancelled");
    }

    /// Verify into_kind hands back the cause.
    #[test]
    fn test_into_kind() {
        let error = ConsumeError::new(
            1,
            ConsumeErrorKind::Handler(anyhow::anyhow!("bad payload")),
        );

        match error.into_kind() {
            ConsumeErrorKind::Handler(cause) => {
                assert_eq!(cause.to_string(), "bad payload");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
