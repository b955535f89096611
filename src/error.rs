use thiserror::Error;

/// Closed error taxonomy for runtime-collaborator and desired-state failures.
///
/// Docker API errors are folded into these kinds once, at the boundary, and
/// propagated unchanged; nothing in this crate retries or suppresses them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to reach the Docker daemon: {0}")]
    ConnectionFailed(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("failed to parse {0}")]
    Parse(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<bollard::errors::Error> for Error {
    fn from(err: bollard::errors::Error) -> Self {
        use bollard::errors::Error as Bollard;
        match err {
            Bollard::DockerResponseServerError {
                status_code: 404,
                message,
            } => Self::NotFound(message),
            Bollard::DockerResponseServerError {
                status_code: 401 | 403,
                message,
            } => Self::PermissionDenied(message),
            Bollard::DockerResponseServerError { message, .. } => Self::Internal(message),
            Bollard::JsonDataError { .. } => Self::Parse(err.to_string()),
            Bollard::IOError { .. } => Self::ConnectionFailed(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_404_to_not_found() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: web".to_string(),
        };
        assert!(matches!(Error::from(err), Error::NotFound(_)));
    }

    #[test]
    fn maps_403_to_permission_denied() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 403,
            message: "operation not permitted".to_string(),
        };
        assert!(matches!(Error::from(err), Error::PermissionDenied(_)));
    }

    #[test]
    fn maps_other_server_errors_to_internal() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "server error".to_string(),
        };
        assert!(matches!(Error::from(err), Error::Internal(_)));
    }
}
