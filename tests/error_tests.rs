//! Tests for the error system.

use tether::error::*;

#[test]
fn error_api_creation() {
    let err = TetherError::api(404, "Not found");
    assert!(matches!(&err, TetherError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "API error (status 404): Not found");
}

#[test]
fn categories_drive_retry_and_recovery() {
    struct Case {
        error: TetherError,
        category: ErrorCategory,
        retryable: bool,
        recovery: RecoverySuggestion,
    }

    let cases = vec![
        Case {
            error: TetherError::Authentication("bad-key".into()),
            category: ErrorCategory::Authentication,
            retryable: false,
            recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: TetherError::RateLimited {
                retry_after_ms: Some(1000),
            },
            category: ErrorCategory::RateLimit,
            retryable: true,
            recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: TetherError::api(503, "overloaded"),
            category: ErrorCategory::Server,
            retryable: true,
            recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: TetherError::api(400, "bad request"),
            category: ErrorCategory::Api,
            retryable: false,
            recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: TetherError::Timeout(30_000),
            category: ErrorCategory::Timeout,
            retryable: true,
            recovery: RecoverySuggestion::IncreaseTimeout,
        },
        Case {
            error: TetherError::protocol("tool call without id"),
            category: ErrorCategory::Protocol,
            retryable: false,
            recovery: RecoverySuggestion::SwitchControlFlow,
        },
        Case {
            error: TetherError::tool("add", "overflow"),
            category: ErrorCategory::ToolExecution,
            retryable: false,
            recovery: RecoverySuggestion::CheckToolImplementation,
        },
        Case {
            error: TetherError::DuplicateTool("add".into()),
            category: ErrorCategory::Configuration,
            retryable: false,
            recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: TetherError::Canceled,
            category: ErrorCategory::Canceled,
            retryable: false,
            recovery: RecoverySuggestion::ContactSupport,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.category, "{}", case.error);
        assert_eq!(case.error.is_retryable(), case.retryable, "{}", case.error);
        assert_eq!(case.error.recovery_suggestion(), case.recovery, "{}", case.error);
    }
}

#[test]
fn tool_errors_name_the_tool() {
    let err = TetherError::tool("send_email", "token expired");
    assert_eq!(
        err.to_string(),
        "Tool execution error: send_email: token expired"
    );
}
