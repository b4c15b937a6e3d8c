// One error type for the whole pipeline.
// Every variant states *where* things went wrong.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The camera is open but has not delivered a frame with known dimensions yet.
    #[error("Camera source not ready")]
    SourceNotReady,
    /// Opening/starting the camera failed.
    #[error("Camera unavailable: {0}")]
    SourceUnavailable(String),
    /// Grabbing/decoding a frame failed.
    #[error("Camera frame error: {0}")]
    CameraFrame(String),
    /// Creating the window failed.
    #[error("Window init error: {0}")]
    WindowInit(String),
    /// Updating the window buffer failed.
    #[error("Window update error: {0}")]
    WindowUpdate(String),
    /// Compressing a frame for upload failed.
    #[error("Encode error: {0}")]
    Encode(String),
    /// The segmentation endpoint could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success status.
    #[error("Service error {status}: {body}")]
    Service { status: u16, body: String },
    /// The endpoint answered 2xx with a body we could not understand.
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Encode(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Runtime(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = Error::Service { status: 500, body: "model overloaded".to_string() };
        assert_eq!(err.to_string(), "Service error 500: model overloaded");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "no threads");
        match Error::from(io_err) {
            Error::Runtime(msg) => assert!(msg.contains("no threads")),
            other => panic!("Expected Runtime error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_display_names_the_stage() {
        assert!(Error::SourceNotReady.to_string().contains("not ready"));
        assert!(Error::Decode("bad json".into()).to_string().contains("bad json"));
        assert!(Error::Transport("refused".into()).to_string().starts_with("Transport"));
    }
}
